use std::path::{ Path, PathBuf };
use std::time::Instant;

use rayon::prelude::*;
use tracing::{ debug, info, info_span };

use crate::config::AppConfig;
use crate::constants::{ EXPERIMENT_DIRECTORY_PREFIX, RUN_FILE_PREFIX };
use crate::environments::{ new_rng, GaussianBanditEnvironment };
use crate::errors::SimulationError;
use crate::n_armed_bandit_game::{ validate_exploratory_rate, NArmedBanditAgent };
use crate::play_logger::PlayLogger;

/// Parameters shared by every simulation of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentSettings {
    pub num_of_arms: usize,
    pub num_of_plays: usize,
    pub num_of_simulations: usize,
    pub exploratory_rate: f64,
    pub reward_std_dev: f64,
    pub seed: Option<u64>,
}

impl ExperimentSettings {
    pub fn from_config(config: &AppConfig, exploratory_rate: f64) -> Self {
        ExperimentSettings {
            num_of_arms: config.num_of_arms,
            num_of_plays: config.num_of_plays,
            num_of_simulations: config.num_of_simulations,
            exploratory_rate,
            reward_std_dev: config.reward_std_dev,
            seed: config.seed,
        }
    }
}

/// Seeds of the environment and agent generators of one simulation. Each
/// simulation gets its own pair so that runs stay independent whatever thread
/// they end up on.
pub fn simulation_seeds(seed: Option<u64>, simulation_number: usize) -> (Option<u64>, Option<u64>) {
    match seed {
        Some(seed) => {
            let stream = (simulation_number as u64).wrapping_mul(2);
            (Some(seed.wrapping_add(stream)), Some(seed.wrapping_add(stream).wrapping_add(1)))
        }
        None => (None, None),
    }
}

/// Shortest decimal form of a rate, e.g. `0`, `0.01`, `0.1`, `1`.
pub fn format_exploratory_rate(exploratory_rate: f64) -> String {
    format!("{}", exploratory_rate)
}

pub fn experiment_directory(output_dir: &Path, exploratory_rate: f64) -> PathBuf {
    output_dir.join(
        format!("{}{}", EXPERIMENT_DIRECTORY_PREFIX, format_exploratory_rate(exploratory_rate))
    )
}

/// Runs every simulation of one experiment and saves one CSV file per simulation.
pub struct SimulationRunner {
    settings: ExperimentSettings,
    output_dir: PathBuf,
}

impl SimulationRunner {
    pub fn new(settings: ExperimentSettings, output_dir: &Path) -> Result<Self, SimulationError> {
        validate_exploratory_rate(settings.exploratory_rate)?;
        if settings.num_of_arms == 0 {
            return Err(SimulationError::InvalidNumberOfArms);
        }
        if !settings.reward_std_dev.is_finite() || settings.reward_std_dev < 0.0 {
            return Err(SimulationError::InvalidRewardStdDev(settings.reward_std_dev));
        }
        Ok(SimulationRunner {
            settings,
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn settings(&self) -> &ExperimentSettings {
        &self.settings
    }

    pub fn experiment_directory(&self) -> PathBuf {
        experiment_directory(&self.output_dir, self.settings.exploratory_rate)
    }

    pub fn run_file_path(&self, simulation_number: usize) -> PathBuf {
        let rate = format_exploratory_rate(self.settings.exploratory_rate);
        let file_name = format!(
            "{}{}_exploratory{}_simulation{}.csv",
            RUN_FILE_PREFIX,
            self.settings.num_of_arms,
            rate,
            simulation_number
        );
        self.experiment_directory().join(file_name)
    }

    /// Plays one simulation from a fresh environment and returns its log.
    /// Nothing is written to disk.
    pub fn run_one_simulation(&self, simulation_number: usize) -> Result<PlayLogger, SimulationError> {
        let _span = info_span!("simulation", number = simulation_number).entered();
        debug!("Start simulation No.{}", simulation_number);

        let (environment_seed, agent_seed) = simulation_seeds(self.settings.seed, simulation_number);
        let mut environment = GaussianBanditEnvironment::new(
            self.settings.num_of_arms,
            new_rng(environment_seed)
        )?.with_reward_std_dev(self.settings.reward_std_dev)?;
        environment.initialize();

        let mut agent = NArmedBanditAgent::new(environment, new_rng(agent_seed))?;
        agent.run(self.settings.num_of_plays, self.settings.exploratory_rate)?;
        Ok(agent.into_play_log())
    }

    /// Runs one simulation and saves it. The file only appears once the whole
    /// simulation has been played.
    pub fn run_and_save_one_simulation(&self, simulation_number: usize) -> Result<PathBuf, SimulationError> {
        let play_log = self.run_one_simulation(simulation_number)?;
        let path = self.run_file_path(simulation_number);
        play_log.write_logs_to_csv(&path)?;
        Ok(path)
    }

    /// Runs all simulations of the experiment in parallel. Simulations are
    /// numbered from 1. Stops at the first failing simulation.
    pub fn run_all_simulations_in_parallel(&self) -> Result<Vec<PathBuf>, SimulationError> {
        info!(
            "arm: {}, exploratory_rate: {}, play: {}, iterations: {}",
            self.settings.num_of_arms,
            self.settings.exploratory_rate,
            self.settings.num_of_plays,
            self.settings.num_of_simulations
        );
        let start_time = Instant::now();
        let paths = (1..=self.settings.num_of_simulations)
            .into_par_iter()
            .map(|simulation_number| self.run_and_save_one_simulation(simulation_number))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Saved {} simulations in {:?}, elapsed time: {:.2?}",
            paths.len(),
            self.experiment_directory(),
            start_time.elapsed()
        );
        Ok(paths)
    }
}

/// Runs one experiment per configured exploratory rate. Returns the experiment
/// directories in the order of the configured rates.
pub fn simulate_n_armed_bandit(config: &AppConfig) -> Result<Vec<PathBuf>, SimulationError> {
    let mut directories = Vec::new();
    for &exploratory_rate in &config.exploratory_rates {
        let settings = ExperimentSettings::from_config(config, exploratory_rate);
        let runner = SimulationRunner::new(settings, &config.output_dir)?;
        runner.run_all_simulations_in_parallel()?;
        directories.push(runner.experiment_directory());
    }
    Ok(directories)
}
