use std::fs::{ self, File };
use std::path::{ Path, PathBuf };

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{ debug, info };

use crate::constants::{
    AVERAGE_REWARD_COLUMN,
    AVERAGE_SUITABLE_ACTION_RATE_COLUMN,
    EXPERIMENT_DIRECTORY_PREFIX,
    EXPLORATORY_RATE_COLUMN,
    PLAY_COUNT_COLUMN,
    RUN_FILE_PREFIX,
};
use crate::errors::AggregationError;
use crate::play_logger::PlayLogger;

/// Digits, optionally followed by a dot and more digits, e.g. `0`, `1`, `0.01`.
fn is_plain_decimal(text: &str) -> bool {
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit());
    match text.split_once('.') {
        Some((integer, fraction)) => all_digits(integer) && all_digits(fraction),
        None => all_digits(text),
    }
}

/// Reads the exploratory rate out of an experiment directory name such as
/// `exploratory0.01`.
pub fn extract_exploratory_rate(directory: &Path) -> Result<f64, AggregationError> {
    let name = directory
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!("source text: {}", name);
    let exploratory_rate = name
        .strip_prefix(EXPERIMENT_DIRECTORY_PREFIX)
        .filter(|rate| is_plain_decimal(rate))
        .and_then(|rate| rate.parse::<f64>().ok())
        .filter(|rate| (0.0..=1.0).contains(rate))
        .ok_or_else(|| AggregationError::MissingExploratoryRate(name.clone()))?;
    debug!("extract result: {}", exploratory_rate);
    Ok(exploratory_rate)
}

/// Number of arms encoded in a run file name such as
/// `n_armed_bandit_arm10_exploratory0.1_simulation3.csv`.
pub fn extract_num_of_arms(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let num_of_arms = stem.strip_prefix(RUN_FILE_PREFIX)?.split('_').next()?;
    if !is_plain_decimal(num_of_arms) || num_of_arms.contains('.') {
        return None;
    }
    num_of_arms.parse().ok()
}

/// All run files of one experiment must come from simulations with the same
/// number of arms.
fn check_num_of_arms(files: &[PathBuf]) -> Result<(), AggregationError> {
    let Some(first) = files.first() else {
        return Ok(());
    };
    let expected = extract_num_of_arms(first);
    for path in files.iter().skip(1) {
        let found = extract_num_of_arms(path);
        if found != expected {
            return Err(AggregationError::NumberOfArmsMismatch {
                path: path.clone(),
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Column-wise mean: element `p` of the result is the mean of element `p` of
/// every row. All rows must have the same length.
pub fn calculate_average_by_play_count(data: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = data.first() else {
        return Vec::new();
    };
    let mut totals = vec![0.0; first.len()];
    for row in data {
        for (total, value) in totals.iter_mut().zip(row) {
            *total += value;
        }
    }
    let num_of_rows = data.len() as f64;
    totals
        .into_iter()
        .map(|total| total / num_of_rows)
        .collect()
}

/// For every play, the fraction of plays so far in which the most suitable
/// action was taken.
pub fn calculate_suitable_action_rate(run: &PlayLogger) -> Vec<f64> {
    let mut suitable_action_count = 0usize;
    run.records()
        .iter()
        .map(|record| {
            if record.is_suitable_action() {
                suitable_action_count += 1;
            }
            (suitable_action_count as f64) / (record.play_count as f64)
        })
        .collect()
}

/// CSV files of one experiment directory, sorted by path.
pub fn list_run_files(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |extension| extension == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Experiment directories under the output root, ordered by exploratory rate.
/// Anything that is not named after an exploratory rate is skipped. Two
/// directories naming the same rate, e.g. `exploratory0.1` and
/// `exploratory0.10`, are an error.
pub fn list_experiment_directories(output_dir: &Path) -> Result<Vec<(f64, PathBuf)>, AggregationError> {
    let mut directories = Vec::new();
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        match extract_exploratory_rate(&path) {
            Ok(exploratory_rate) => directories.push((exploratory_rate, path)),
            Err(_) => debug!("Skipping {:?}, not an experiment directory", path),
        }
    }
    directories.sort_by(|(a, first), (b, second)| a.total_cmp(b).then_with(|| first.cmp(second)));
    if let Some(pair) = directories.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(AggregationError::DuplicateExploratoryRate {
            exploratory_rate: pair[0].0,
            first: pair[0].1.clone(),
            second: pair[1].1.clone(),
        });
    }
    Ok(directories)
}

/// All the runs of one experiment, checked to share the same play counts.
#[derive(Debug, Clone)]
pub struct ExperimentStatistics {
    exploratory_rate: f64,
    play_counts: Vec<usize>,
    runs: Vec<PlayLogger>,
}

impl ExperimentStatistics {
    pub fn new(exploratory_rate: f64, runs: Vec<PlayLogger>) -> Result<Self, AggregationError> {
        Self::with_source(exploratory_rate, runs, PathBuf::new())
    }

    fn with_source(
        exploratory_rate: f64,
        runs: Vec<PlayLogger>,
        source: PathBuf
    ) -> Result<Self, AggregationError> {
        let play_counts = runs
            .first()
            .map(PlayLogger::play_counts)
            .ok_or(AggregationError::EmptyExperiment(source))?;

        for (position, &play_count) in play_counts.iter().enumerate() {
            if play_count != position + 1 {
                return Err(AggregationError::PlayCountGap { position, found: play_count });
            }
        }
        for (run, log) in runs.iter().enumerate().skip(1) {
            if log.len() != play_counts.len() || log.play_counts() != play_counts {
                return Err(AggregationError::PlayCountMismatch { run });
            }
        }
        debug!("Extracted Play Counts: {}", play_counts.len());

        Ok(ExperimentStatistics {
            exploratory_rate,
            play_counts,
            runs,
        })
    }

    /// Loads every run file of an experiment directory. Files are read in
    /// parallel and all of them are loaded before anything is computed.
    pub fn from_directory(directory: &Path) -> Result<Self, AggregationError> {
        let exploratory_rate = extract_exploratory_rate(directory)?;
        debug!("Exploratory Rate: {}", exploratory_rate);

        let files = list_run_files(directory)?;
        check_num_of_arms(&files)?;
        let runs = files
            .par_iter()
            .map(|path| {
                PlayLogger::read_logs_from_csv(path).map_err(|source| AggregationError::RunLog {
                    path: path.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!("Read {} runs from {:?}", runs.len(), directory);

        Self::with_source(exploratory_rate, runs, directory.to_path_buf())
    }

    pub fn exploratory_rate(&self) -> f64 {
        self.exploratory_rate
    }

    pub fn play_counts(&self) -> &[usize] {
        &self.play_counts
    }

    pub fn num_of_runs(&self) -> usize {
        self.runs.len()
    }

    pub fn average_rewards(&self) -> Vec<f64> {
        let rewards: Vec<Vec<f64>> = self.runs.iter().map(PlayLogger::rewards_by_play_count).collect();
        calculate_average_by_play_count(&rewards)
    }

    pub fn average_suitable_action_rates(&self) -> Vec<f64> {
        let rates: Vec<Vec<f64>> = self.runs.iter().map(calculate_suitable_action_rate).collect();
        calculate_average_by_play_count(&rates)
    }

    pub fn average_reward_by_play_count(&self) -> PolarsResult<DataFrame> {
        let df = self.summary_dataframe(AVERAGE_REWARD_COLUMN, self.average_rewards())?;
        debug!("average_rewards_by_play_counts: {:?}", df.head(Some(5)));
        Ok(df)
    }

    pub fn average_suitable_action_rate_by_play_count(&self) -> PolarsResult<DataFrame> {
        let df = self.summary_dataframe(
            AVERAGE_SUITABLE_ACTION_RATE_COLUMN,
            self.average_suitable_action_rates()
        )?;
        debug!("average_suitable_action_rate_by_play_count: {:?}", df.head(Some(5)));
        Ok(df)
    }

    fn summary_dataframe(&self, name: &str, averages: Vec<f64>) -> PolarsResult<DataFrame> {
        let play_counts: Vec<u64> = self.play_counts
            .iter()
            .map(|&play_count| play_count as u64)
            .collect();
        let exploratory_rates = vec![self.exploratory_rate; play_counts.len()];
        DataFrame::new(
            vec![
                Series::new(PLAY_COUNT_COLUMN, play_counts),
                Series::new(EXPLORATORY_RATE_COLUMN, exploratory_rates),
                Series::new(name, averages)
            ]
        )
    }
}

/// Summaries of every experiment found under `output_dir`, stacked in order of
/// exploratory rate: (average reward table, average suitable action rate table).
pub fn summarize_experiments(output_dir: &Path) -> Result<(DataFrame, DataFrame), AggregationError> {
    let directories = list_experiment_directories(output_dir)?;
    let mut rewards: Option<DataFrame> = None;
    let mut rates: Option<DataFrame> = None;

    for (_, directory) in directories {
        let statistics = ExperimentStatistics::from_directory(&directory)?;
        let reward_df = statistics.average_reward_by_play_count()?;
        let rate_df = statistics.average_suitable_action_rate_by_play_count()?;
        rewards = Some(match rewards {
            Some(df) => df.vstack(&reward_df)?,
            None => reward_df,
        });
        rates = Some(match rates {
            Some(df) => df.vstack(&rate_df)?,
            None => rate_df,
        });
    }

    match (rewards, rates) {
        (Some(rewards), Some(rates)) => Ok((rewards, rates)),
        _ => Err(AggregationError::EmptyExperiment(output_dir.to_path_buf())),
    }
}

pub fn write_summary_to_csv(df: &mut DataFrame, path: &Path) -> Result<(), AggregationError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).has_header(true).finish(df)?;
    info!("Summary saved in file: {:?}", path);
    Ok(())
}

/// Aggregates one experiment directory and writes both summaries next to it,
/// e.g. `output/average_reward_exploratory0.1.csv`.
pub fn write_experiment_summaries(directory: &Path) -> Result<Vec<PathBuf>, AggregationError> {
    let statistics = ExperimentStatistics::from_directory(directory)?;
    let parent = directory.parent().unwrap_or_else(|| Path::new("."));
    let suffix = directory
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let reward_path = parent.join(format!("{}_{}.csv", AVERAGE_REWARD_COLUMN, suffix));
    let rate_path = parent.join(format!("{}_{}.csv", AVERAGE_SUITABLE_ACTION_RATE_COLUMN, suffix));
    write_summary_to_csv(&mut statistics.average_reward_by_play_count()?, &reward_path)?;
    write_summary_to_csv(&mut statistics.average_suitable_action_rate_by_play_count()?, &rate_path)?;
    Ok(vec![reward_path, rate_path])
}

/// Aggregates every experiment under `output_dir` into two stacked summaries
/// written at the root of `output_dir`.
pub fn write_all_summaries(output_dir: &Path) -> Result<Vec<PathBuf>, AggregationError> {
    let (mut rewards, mut rates) = summarize_experiments(output_dir)?;
    let reward_path = output_dir.join(format!("{}.csv", AVERAGE_REWARD_COLUMN));
    let rate_path = output_dir.join(format!("{}.csv", AVERAGE_SUITABLE_ACTION_RATE_COLUMN));
    write_summary_to_csv(&mut rewards, &reward_path)?;
    write_summary_to_csv(&mut rates, &rate_path)?;
    Ok(vec![reward_path, rate_path])
}
