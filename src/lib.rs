//! Epsilon-greedy agents playing the n-armed bandit problem, and the statistics
//! that compare exploratory rates across many independent simulations.

pub mod config;
pub mod constants;
pub mod environments;
pub mod errors;
pub mod n_armed_bandit_game;
pub mod play_logger;
pub mod simulation_runner;
pub mod statistics_calculator;

pub use config::AppConfig;
pub use environments::{ Arm, GaussianBanditEnvironment };
pub use errors::{ AggregationError, ConfigurationError, SimulationError };
pub use n_armed_bandit_game::NArmedBanditAgent;
pub use play_logger::{ PlayLogger, PlayRecord };
pub use simulation_runner::{ ExperimentSettings, SimulationRunner };
pub use statistics_calculator::ExperimentStatistics;
