use std::path::{ Path, PathBuf };

use config::{ Config, Environment, File };
use serde::Deserialize;

use crate::constants::{
    EXPLORATORY_RATES,
    LOG_LEVEL,
    NUM_OF_ARMS,
    NUM_OF_PLAYS,
    NUM_OF_SIMULATIONS,
    OUTPUT_DIRECTORY,
    REWARD_STD_DEV,
};
use crate::errors::ConfigurationError;

/// Parameters of a whole simulation session. Every exploratory rate is run as
/// its own experiment with the same arm, play and simulation counts.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub num_of_arms: usize,
    pub num_of_plays: usize,
    pub num_of_simulations: usize,
    pub exploratory_rates: Vec<f64>,
    pub reward_std_dev: f64,
    pub output_dir: PathBuf,
    /// When set, every simulation gets generators derived from this seed.
    pub seed: Option<u64>,
    pub log_level: String,
    /// When set, logs go to a timestamped file in this directory instead of stderr.
    pub log_directory: Option<PathBuf>,
}

impl AppConfig {
    /// Layers built-in defaults, an optional config file and `BANDIT_*`
    /// environment variables, in that order. Without an explicit `path`, a
    /// `bandit.{toml,yaml,json}` file in the working directory is used if present.
    /// Values are not validated here, call `validate` once every override is applied.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let builder = Config::builder()
            .set_default("num_of_arms", NUM_OF_ARMS as i64)?
            .set_default("num_of_plays", NUM_OF_PLAYS as i64)?
            .set_default("num_of_simulations", NUM_OF_SIMULATIONS as i64)?
            .set_default("exploratory_rates", EXPLORATORY_RATES.to_vec())?
            .set_default("reward_std_dev", REWARD_STD_DEV)?
            .set_default("output_dir", OUTPUT_DIRECTORY)?
            .set_default("log_level", LOG_LEVEL)?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("bandit").required(false)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix("BANDIT")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("exploratory_rates")
            )
            .build()?;

        Ok(config.try_deserialize::<AppConfig>()?)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.num_of_arms == 0 {
            return Err(ConfigurationError::NotPositive("num_of_arms"));
        }
        if self.num_of_plays == 0 {
            return Err(ConfigurationError::NotPositive("num_of_plays"));
        }
        if self.num_of_simulations == 0 {
            return Err(ConfigurationError::NotPositive("num_of_simulations"));
        }
        if self.exploratory_rates.is_empty() {
            return Err(ConfigurationError::NoExploratoryRates);
        }
        if let Some(&rate) = self.exploratory_rates.iter().find(|rate| !(0.0..=1.0).contains(*rate)) {
            return Err(ConfigurationError::InvalidExploratoryRate(rate));
        }
        if !self.reward_std_dev.is_finite() || self.reward_std_dev < 0.0 {
            return Err(ConfigurationError::InvalidRewardStdDev(self.reward_std_dev));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            num_of_arms: NUM_OF_ARMS,
            num_of_plays: NUM_OF_PLAYS,
            num_of_simulations: NUM_OF_SIMULATIONS,
            exploratory_rates: EXPLORATORY_RATES.to_vec(),
            reward_std_dev: REWARD_STD_DEV,
            output_dir: PathBuf::from(OUTPUT_DIRECTORY),
            seed: None,
            log_level: LOG_LEVEL.to_string(),
            log_directory: None,
        }
    }
}
