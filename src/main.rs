mod cli;
mod logging;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::{ error, info };

use cli::{ Cli, Command };
use n_armed_bandit::simulation_runner::simulate_n_armed_bandit;
use n_armed_bandit::statistics_calculator::{ write_all_summaries, write_experiment_summaries };
use n_armed_bandit::AppConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Cannot read config")?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    if let Some(path) = logging::init_tracing(&config.log_level, config.log_directory.as_deref())? {
        eprintln!("Logging to {:?}", path);
    }

    let result = match &cli.command {
        Command::Simulate(_) => simulate(&config),
        Command::Aggregate { dir } => aggregate(&config, dir.as_deref()),
        Command::Run(_) => simulate(&config).and_then(|_| aggregate(&config, None)),
    };
    if let Err(err) = &result {
        error!("{:#}", err);
    }
    result
}

fn simulate(config: &AppConfig) -> anyhow::Result<()> {
    info!("Simulating with {:?}", config);
    let directories = simulate_n_armed_bandit(config).context("Simulation failed")?;
    for directory in directories {
        info!("Simulations saved in {:?}", directory);
    }
    Ok(())
}

fn aggregate(config: &AppConfig, directory: Option<&Path>) -> anyhow::Result<()> {
    let paths = match directory {
        Some(directory) => {
            write_experiment_summaries(directory).with_context(|| format!("Failed to aggregate {:?}", directory))?
        }
        None => {
            write_all_summaries(&config.output_dir).with_context(|| {
                format!("Failed to aggregate experiments in {:?}", config.output_dir)
            })?
        }
    };
    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}
