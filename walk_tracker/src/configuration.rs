use std::{path::{Path, PathBuf}, str::FromStr};

use const_format::concatcp;
use tokio::time::Duration;
use walk_tracker_data_management::{DATA_DIR, STORE_DIR};

use crate::location::DEFAULT_REPLAY_PACE;

pub const DEFAULT_CONFIG_FILE: &str = "walk_tracker.conf";
pub const DEFAULT_LOG_FILE: &str = concatcp!(DATA_DIR, "log/walk_tracker.log");

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub replay_pace: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("line {line}: expected `key = value`")]
    Syntax { line: usize },
    #[error("line {line}: invalid value {value:?} for {key}")]
    Value { line: usize, key: String, value: String },
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(STORE_DIR),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            replay_pace: DEFAULT_REPLAY_PACE,
        }
    }
}

impl Configuration {
    /// Reads `key = value` lines. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let number = index + 1;
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax { line: number });
            };
            let (key, value) = (key.trim(), value.trim());
            let invalid = || ConfigError::Value { line: number, key: key.to_string(), value: value.to_string() };

            match key {
                "data_dir" if !value.is_empty() => config.data_dir = PathBuf::from(value),
                "log_file" if !value.is_empty() => config.log_file = PathBuf::from(value),
                "replay_pace_ms" => {
                    let millis = u64::from_str(value).map_err(|_| invalid())?;
                    config.replay_pace = Duration::from_millis(millis);
                }
                "data_dir" | "log_file" => return Err(invalid()),
                _ => {
                    tracing::warn!("Unknown config key: {}", key);
                }
            }
        }

        Ok(config)
    }

    /// A missing file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
        }
    }
}
