/// Represents the number of slot machines being played in n-armed bandit problem, it is the number n.
pub const NUM_OF_ARMS: usize = 10;
/// Represents the number of plays in one simulation.
pub const NUM_OF_PLAYS: usize = 1000;
/// Represent number of independent simulations to run for each exploratory rate.
pub const NUM_OF_SIMULATIONS: usize = 2000;
/// Represents the probabilities with which random action is selected. Each rate is
/// its own experiment. Expected to be in bounds 0 <= rate <= 1. When rate = 0, agent
/// always takes greedy action (apart from the very first play). When rate = 1, agent
/// always takes exploratory action.
pub const EXPLORATORY_RATES: [f64; 3] = [0.0, 0.01, 0.1];
/// Standard deviation of the noise around the true action value of each arm.
pub const REWARD_STD_DEV: f64 = 1.0;
/// Root directory where simulation results are saved.
pub const OUTPUT_DIRECTORY: &str = "output";
/// Every experiment directory is named with this prefix followed by its exploratory rate.
pub const EXPERIMENT_DIRECTORY_PREFIX: &str = "exploratory";
/// Every run file name starts with this prefix followed by the number of arms.
pub const RUN_FILE_PREFIX: &str = "n_armed_bandit_arm";
/// Default level used when RUST_LOG is not set.
pub const LOG_LEVEL: &str = "info";

/// Column names of one persisted run, in file order.
pub const PLAY_COUNT_COLUMN: &str = "play_count";
pub const ACTION_COLUMN: &str = "action";
pub const REWARD_COLUMN: &str = "reward";
pub const MOST_SUITABLE_ACTION_COLUMN: &str = "most_suitable_action";
pub const EXPLORATORY_RATE_COLUMN: &str = "exploratory_rate";

/// Column names of the aggregated tables.
pub const AVERAGE_REWARD_COLUMN: &str = "average_reward";
pub const AVERAGE_SUITABLE_ACTION_RATE_COLUMN: &str = "average_suitable_action_rate";
