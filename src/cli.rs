use std::path::PathBuf;

use clap::{ Args, Parser, Subcommand };
use n_armed_bandit::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "n_armed_bandit", version, about = "Epsilon-greedy n-armed bandit simulations")]
pub struct Cli {
    /// Config file, defaults to bandit.{toml,yaml,json} in the working directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory of the experiment directories
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Seed for reproducible simulations
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one experiment per exploratory rate and save every simulation
    Simulate(SimulateArgs),
    /// Average the saved simulations by play count
    Aggregate {
        /// One experiment directory; every experiment under the output dir when omitted
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Simulate, then aggregate every experiment
    Run(SimulateArgs),
}

#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct SimulateArgs {
    /// Number of arms
    #[arg(long)]
    pub arms: Option<usize>,

    /// Number of plays in one simulation
    #[arg(long)]
    pub plays: Option<usize>,

    /// Number of simulations for each exploratory rate
    #[arg(long)]
    pub simulations: Option<usize>,

    /// Exploratory rate, repeat for several experiments
    #[arg(long = "rate")]
    pub rates: Vec<f64>,
}

impl Cli {
    /// Command line values win over every other config source.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Command::Simulate(args) | Command::Run(args) = &self.command {
            args.apply_overrides(config);
        }
    }
}

impl SimulateArgs {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(arms) = self.arms {
            config.num_of_arms = arms;
        }
        if let Some(plays) = self.plays {
            config.num_of_plays = plays;
        }
        if let Some(simulations) = self.simulations {
            config.num_of_simulations = simulations;
        }
        if !self.rates.is_empty() {
            config.exploratory_rates = self.rates.clone();
        }
    }
}
