use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::environments::Arm;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Number of arms must be positive")]
    InvalidNumberOfArms,
    #[error("Exploratory rate {0} cannot be handled, it must be in the range [0, 1]")]
    InvalidExploratoryRate(f64),
    #[error("Reward standard deviation {0} must be finite and not negative")]
    InvalidRewardStdDev(f64),
    #[error("Expected {expected} true action values, got {actual}")]
    TrueActionValuesMismatch { expected: usize, actual: usize },
    #[error("most_suitable_action is not set")]
    MostSuitableActionNotSet,
    #[error("Create true action values before you run this method")]
    EnvironmentNotInitialized,
    #[error("Arm {arm} is outside of the range [1, {num_of_arms}]")]
    ArmOutOfRange { arm: Arm, num_of_arms: usize },
    #[error("Column {column} is missing or malformed: {reason}")]
    MalformedRunLog { column: String, reason: String },
    #[error("I/O error while persisting logs: {0}")]
    Io(#[from] std::io::Error),
    #[error("Tabular error: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Cannot extract exploratory rate from directory name {0:?}")]
    MissingExploratoryRate(String),
    #[error("No run logs found for the experiment in {0:?}")]
    EmptyExperiment(PathBuf),
    #[error("Directories {first:?} and {second:?} hold the same exploratory rate {exploratory_rate}")]
    DuplicateExploratoryRate {
        exploratory_rate: f64,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Run {path:?} was played with {found:?} arms, the first run with {expected:?}")]
    NumberOfArmsMismatch {
        path: PathBuf,
        expected: Option<usize>,
        found: Option<usize>,
    },
    #[error("Run {run} has play counts that differ from the first run")]
    PlayCountMismatch { run: usize },
    #[error("Play counts must run from 1 without gaps, found {found} at position {position}")]
    PlayCountGap { position: usize, found: usize },
    #[error("Failed to read {path:?}: {source}")]
    RunLog {
        path: PathBuf,
        #[source]
        source: SimulationError,
    },
    #[error("I/O error while reading experiment: {0}")]
    Io(#[from] std::io::Error),
    #[error("Tabular error: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("At least one exploratory rate is required")]
    NoExploratoryRates,
    #[error("Exploratory rate {0} cannot be handled, it must be in the range [0, 1]")]
    InvalidExploratoryRate(f64),
    #[error("Reward standard deviation {0} must be finite and not negative")]
    InvalidRewardStdDev(f64),
    #[error(transparent)]
    Source(#[from] ::config::ConfigError),
}
