use std::collections::BTreeMap;
use std::fs::{ self, File };
use std::path::{ Path, PathBuf };

use polars::prelude::*;
use tracing::{ debug, error, trace };

use crate::constants::{
    ACTION_COLUMN,
    EXPLORATORY_RATE_COLUMN,
    MOST_SUITABLE_ACTION_COLUMN,
    PLAY_COUNT_COLUMN,
    REWARD_COLUMN,
};
use crate::environments::Arm;
use crate::errors::SimulationError;

/// One play of one simulation.
#[derive(PartialEq, Debug, Clone)]
pub struct PlayRecord {
    /// Starts at 1 and grows by one every play.
    pub play_count: usize,
    pub action: Arm,
    pub reward: f64,
    /// The arm with the largest true action value in the simulation.
    pub most_suitable_action: Arm,
    pub exploratory_rate: f64,
}

impl PlayRecord {
    pub fn is_suitable_action(&self) -> bool {
        self.action == self.most_suitable_action
    }
}

/// Append-only log of every play in one simulation. This is what gets
/// persisted at the end of a run and what the aggregation reads back.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PlayLogger {
    logs: Vec<PlayRecord>,
    most_suitable_action: Option<Arm>,
}

impl PlayLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_most_suitable_action(most_suitable_action: Arm) -> Self {
        PlayLogger {
            logs: Vec::new(),
            most_suitable_action: Some(most_suitable_action),
        }
    }

    /// Rebuilds a log from records that were already registered, e.g. read from disk.
    pub fn from_records(logs: Vec<PlayRecord>) -> Self {
        let most_suitable_action = logs.first().map(|record| record.most_suitable_action);
        PlayLogger { logs, most_suitable_action }
    }

    pub fn set_most_suitable_action(&mut self, most_suitable_action: Option<Arm>) {
        self.most_suitable_action = most_suitable_action;
    }

    pub fn most_suitable_action(&self) -> Option<Arm> {
        self.most_suitable_action
    }

    /// Builds the record for one play without touching the log.
    pub fn create_record(
        &self,
        play_count: usize,
        action: Arm,
        reward: f64,
        exploratory_rate: f64
    ) -> Result<PlayRecord, SimulationError> {
        let most_suitable_action = self.most_suitable_action.ok_or_else(|| {
            error!("most_suitable_action is not set.");
            SimulationError::MostSuitableActionNotSet
        })?;
        Ok(PlayRecord {
            play_count,
            action,
            reward,
            most_suitable_action,
            exploratory_rate,
        })
    }

    pub fn register(
        &mut self,
        play_count: usize,
        action: Arm,
        reward: f64,
        exploratory_rate: f64
    ) -> Result<&PlayRecord, SimulationError> {
        let record = self.create_record(play_count, action, reward, exploratory_rate)?;
        trace!(play_count, action, reward, exploratory_rate, "Registered log");
        self.logs.push(record);
        Ok(&self.logs[self.logs.len() - 1])
    }

    pub fn records(&self) -> &[PlayRecord] {
        &self.logs
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Rewards grouped by the arm that produced them, each list in play order.
    pub fn rewards_by_action(&self) -> BTreeMap<Arm, Vec<f64>> {
        let mut rewards_by_action: BTreeMap<Arm, Vec<f64>> = BTreeMap::new();
        for record in &self.logs {
            rewards_by_action.entry(record.action).or_default().push(record.reward);
        }
        rewards_by_action
    }

    pub fn rewards_by_play_count(&self) -> Vec<f64> {
        self.logs
            .iter()
            .map(|record| record.reward)
            .collect()
    }

    pub fn play_counts(&self) -> Vec<usize> {
        self.logs
            .iter()
            .map(|record| record.play_count)
            .collect()
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let play_counts: Vec<u64> = self.logs
            .iter()
            .map(|record| record.play_count as u64)
            .collect();
        let actions: Vec<u64> = self.logs
            .iter()
            .map(|record| record.action as u64)
            .collect();
        let most_suitable_actions: Vec<u64> = self.logs
            .iter()
            .map(|record| record.most_suitable_action as u64)
            .collect();
        let exploratory_rates: Vec<f64> = self.logs
            .iter()
            .map(|record| record.exploratory_rate)
            .collect();

        DataFrame::new(
            vec![
                Series::new(PLAY_COUNT_COLUMN, play_counts),
                Series::new(ACTION_COLUMN, actions),
                Series::new(REWARD_COLUMN, self.rewards_by_play_count()),
                Series::new(MOST_SUITABLE_ACTION_COLUMN, most_suitable_actions),
                Series::new(EXPLORATORY_RATE_COLUMN, exploratory_rates)
            ]
        )
    }

    /// Writes the whole log as CSV. The data goes to a temporary sibling file
    /// first and is renamed into place, so `path` either holds the complete log
    /// or does not exist.
    pub fn write_logs_to_csv(&self, path: &Path) -> Result<(), SimulationError> {
        debug!("Exporting logs... Path: {:?}", path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut df = self.to_dataframe()?;
        let temporary_path = temporary_path_for(path);

        let written = File::create(&temporary_path)
            .map_err(SimulationError::from)
            .and_then(|mut file| {
                CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
                file.sync_all()?;
                Ok(())
            })
            .and_then(|_| fs::rename(&temporary_path, path).map_err(SimulationError::from));

        if let Err(err) = written {
            let _ = fs::remove_file(&temporary_path);
            return Err(err);
        }
        debug!("Exporting logs has done. Path: {:?}", path);
        Ok(())
    }

    pub fn read_logs_from_csv(path: &Path) -> Result<Self, SimulationError> {
        trace!("reading {:?}", path);
        let df = CsvReader::from_path(path)?.has_header(true).finish()?;

        let play_counts = unsigned_column(&df, PLAY_COUNT_COLUMN)?;
        let actions = unsigned_column(&df, ACTION_COLUMN)?;
        let rewards = float_column(&df, REWARD_COLUMN)?;
        let most_suitable_actions = unsigned_column(&df, MOST_SUITABLE_ACTION_COLUMN)?;
        let exploratory_rates = float_column(&df, EXPLORATORY_RATE_COLUMN)?;

        let logs = play_counts
            .into_iter()
            .zip(actions)
            .zip(rewards)
            .zip(most_suitable_actions)
            .zip(exploratory_rates)
            .map(|((((play_count, action), reward), most_suitable_action), exploratory_rate)| {
                PlayRecord {
                    play_count,
                    action,
                    reward,
                    most_suitable_action,
                    exploratory_rate,
                }
            })
            .collect();
        Ok(Self::from_records(logs))
    }
}

fn temporary_path_for(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

fn malformed(column: &str, reason: impl ToString) -> SimulationError {
    SimulationError::MalformedRunLog {
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, SimulationError> {
    let series = df
        .column(name)
        .map_err(|err| malformed(name, err))?
        .cast(&DataType::Float64)
        .map_err(|err| malformed(name, err))?;
    let values = series.f64().map_err(|err| malformed(name, err))?;
    values
        .into_iter()
        .map(|value| value.ok_or_else(|| malformed(name, "missing value")))
        .collect()
}

fn unsigned_column(df: &DataFrame, name: &str) -> Result<Vec<usize>, SimulationError> {
    let column = df.column(name).map_err(|err| malformed(name, err))?;
    // Casting a float column to an integer one truncates, so only integer columns are accepted.
    let is_integer = matches!(
        column.dtype(),
        DataType::Int8 |
            DataType::Int16 |
            DataType::Int32 |
            DataType::Int64 |
            DataType::UInt8 |
            DataType::UInt16 |
            DataType::UInt32 |
            DataType::UInt64
    );
    if !is_integer {
        return Err(malformed(name, format!("expected whole numbers, found {}", column.dtype())));
    }
    let series = column
        .cast(&DataType::Int64)
        .map_err(|err| malformed(name, err))?;
    let values = series.i64().map_err(|err| malformed(name, err))?;
    values
        .into_iter()
        .map(|value| {
            let value = value.ok_or_else(|| malformed(name, "missing value"))?;
            usize::try_from(value).map_err(|_| malformed(name, format!("negative value {}", value)))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use std::fs;

    use approx::assert_relative_eq;
    use tempfile::tempdir;

    use super::*;

    fn sample_logger() -> PlayLogger {
        let mut logger = PlayLogger::with_most_suitable_action(2);
        logger.register(1, 1, 0.5, 0.1).unwrap();
        logger.register(2, 2, 1.25, 0.1).unwrap();
        logger.register(3, 1, -0.5, 0.1).unwrap();
        logger.register(4, 3, 2.0, 0.1).unwrap();
        logger.register(5, 2, 0.75, 0.1).unwrap();
        logger
    }

    #[test]
    fn test_register_without_most_suitable_action_fails() {
        let mut logger = PlayLogger::new();

        let result = logger.register(1, 1, 0.5, 0.1);

        assert!(matches!(result, Err(SimulationError::MostSuitableActionNotSet)));
        assert!(logger.is_empty(), "Failed registration must not append a record");
    }

    #[test]
    fn test_register_copies_most_suitable_action() {
        let mut logger = PlayLogger::new();
        logger.set_most_suitable_action(Some(3));

        let record = logger.register(1, 2, 0.5, 0.01).unwrap().clone();

        assert_eq!(record, PlayRecord {
            play_count: 1,
            action: 2,
            reward: 0.5,
            most_suitable_action: 3,
            exploratory_rate: 0.01,
        });
        assert!(!record.is_suitable_action());
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn test_rewards_by_action_keeps_observation_order() {
        let logger = sample_logger();

        let rewards = logger.rewards_by_action();

        assert_eq!(rewards.len(), 3);
        assert_eq!(rewards[&1], vec![0.5, -0.5]);
        assert_eq!(rewards[&2], vec![1.25, 0.75]);
        assert_eq!(rewards[&3], vec![2.0]);
    }

    #[test]
    fn test_rewards_by_play_count() {
        let logger = sample_logger();

        assert_eq!(logger.rewards_by_play_count(), vec![0.5, 1.25, -0.5, 2.0, 0.75]);
        assert_eq!(logger.play_counts(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_dataframe_columns_in_file_order() {
        let df = sample_logger().to_dataframe().unwrap();

        assert_eq!(df.shape(), (5, 5));
        assert_eq!(df.get_column_names(), vec![
            "play_count",
            "action",
            "reward",
            "most_suitable_action",
            "exploratory_rate"
        ]);
    }

    #[test]
    fn test_write_and_read_logs_from_csv() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("exploratory0.1").join("run.csv");
        let logger = sample_logger();

        logger.write_logs_to_csv(&path).unwrap();
        let restored = PlayLogger::read_logs_from_csv(&path).unwrap();

        assert_eq!(restored.len(), logger.len());
        assert_eq!(restored.most_suitable_action(), Some(2));
        for (expected, actual) in logger.records().iter().zip(restored.records()) {
            assert_eq!(actual.play_count, expected.play_count);
            assert_eq!(actual.action, expected.action);
            assert_eq!(actual.most_suitable_action, expected.most_suitable_action);
            assert_relative_eq!(actual.reward, expected.reward);
            assert_relative_eq!(actual.exploratory_rate, expected.exploratory_rate);
        }
    }

    #[test]
    fn test_csv_header_row() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("run.csv");

        sample_logger().write_logs_to_csv(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();

        assert_eq!(
            content.lines().next(),
            Some("play_count,action,reward,most_suitable_action,exploratory_rate")
        );
        assert_eq!(content.lines().count(), 6, "One header row and one row per play expected");
    }

    #[test]
    fn test_write_leaves_no_temporary_file() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("run.csv");

        sample_logger().write_logs_to_csv(&path).unwrap();

        let names: Vec<_> = fs::read_dir(directory.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("run.csv")]);
    }

    #[test]
    fn test_read_logs_with_missing_column_fails() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("run.csv");
        fs::write(&path, "play_count,action,reward\n1,1,0.5\n").unwrap();

        let result = PlayLogger::read_logs_from_csv(&path);

        assert!(
            matches!(
                result,
                Err(SimulationError::MalformedRunLog { ref column, .. }) if column == "most_suitable_action"
            )
        );
    }

    #[test]
    fn test_read_logs_with_fractional_play_count_fails() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("run.csv");
        fs::write(
            &path,
            "play_count,action,reward,most_suitable_action,exploratory_rate\n1.9,1.5,0.5,1,0.1\n2.2,2.7,0.5,1,0.1\n"
        ).unwrap();

        let result = PlayLogger::read_logs_from_csv(&path);

        assert!(
            matches!(
                result,
                Err(SimulationError::MalformedRunLog { ref column, .. }) if column == "play_count"
            )
        );
    }

    #[test]
    fn test_read_logs_with_fractional_action_fails() {
        let directory = tempdir().unwrap();
        let path = directory.path().join("run.csv");
        fs::write(
            &path,
            "play_count,action,reward,most_suitable_action,exploratory_rate\n1,1.5,0.5,1,0.1\n2,2.7,0.5,1,0.1\n"
        ).unwrap();

        let result = PlayLogger::read_logs_from_csv(&path);

        assert!(
            matches!(
                result,
                Err(SimulationError::MalformedRunLog { ref column, .. }) if column == "action"
            )
        );
    }

    #[test]
    fn test_temporary_path_is_a_sibling() {
        let path = Path::new("output/exploratory0.1/run.csv");

        assert_eq!(temporary_path_for(path), PathBuf::from("output/exploratory0.1/run.csv.tmp"));
    }
}
