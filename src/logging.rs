use std::fs::{ self, File };
use std::path::{ Path, PathBuf };
use std::sync::Mutex;

use anyhow::{ anyhow, Context };
use chrono::prelude::*;
use tracing_subscriber::EnvFilter;

pub fn get_timestamped_file_path(directory: &Path, file_name: &str) -> PathBuf {
    let local: DateTime<Local> = Local::now();
    let datetime_str = local.format("%Y%m%d%H%M%S").to_string();
    directory.join(format!("{}_{}.log", file_name, datetime_str))
}

/// Installs the global subscriber. `RUST_LOG` wins over `log_level` when set.
/// With a `log_directory`, events go to a fresh timestamped file whose path is
/// returned; otherwise they go to stderr.
pub fn init_tracing(log_level: &str, log_directory: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .with_context(|| format!("Invalid log level {:?}", log_level))?;

    match log_directory {
        Some(directory) => {
            fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {:?}", directory))?;
            let path = get_timestamped_file_path(directory, "bandit_simulation");
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow!(err))?;
            Ok(Some(path))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|err| anyhow!(err))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_timestamped_file_path() {
        let directory = Path::new("logs");

        let path = get_timestamped_file_path(directory, "bandit_simulation");

        assert_eq!(path.parent(), Some(directory));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("bandit_simulation_"));
        assert!(name.ends_with(".log"));
        // bandit_simulation_ + 14 digits + .log
        assert_eq!(name.len(), "bandit_simulation_".len() + 14 + ".log".len());
    }
}
