//! Application configuration with layered resolution.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`TOWN_STATS_INPUT`, `TOWN_STATS_OUTPUT_DIR`)
//! 2. Config file (`$TOWN_STATS_CONFIG`, else `town-stats.json` in the
//!    working directory)
//! 3. Compiled defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "town-stats.json";
pub const ENV_CONFIG: &str = "TOWN_STATS_CONFIG";
pub const ENV_INPUT: &str = "TOWN_STATS_INPUT";
pub const ENV_OUTPUT_DIR: &str = "TOWN_STATS_OUTPUT_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config field '{field}' must not be empty")]
    Empty { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dataset opened at start-up when it exists.
    pub input_path: PathBuf,
    /// Directory exports are written under.
    pub output_dir: PathBuf,
    /// Initial window size in points.
    pub window_size: [f32; 2],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("output.csv"),
            output_dir: default_output_dir(),
            window_size: [1200.0, 800.0],
        }
    }
}

impl AppConfig {
    /// Resolve the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os(ENV_CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::resolve(&file, |key| std::env::var_os(key).map(PathBuf::from))
    }

    /// Resolve from an explicit config file path and variable lookup.
    /// A missing file is not an error; the defaults are used instead.
    pub fn resolve(
        file: &Path,
        env: impl Fn(&str) -> Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let mut config = if file.exists() {
            log::info!("Reading config from {}", file.display());
            Self::from_file(file)?
        } else {
            Self::default()
        };

        if let Some(input) = env(ENV_INPUT) {
            config.input_path = input;
        }
        if let Some(output) = env(ENV_OUTPUT_DIR) {
            config.output_dir = output;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_path.as_os_str().is_empty() {
            return Err(ConfigError::Empty { field: "input_path" });
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Empty { field: "output_dir" });
        }
        Ok(())
    }
}

/// `<home>/Downloads`, or `Downloads` relative to the working directory
/// when no home directory is known.
fn default_output_dir() -> PathBuf {
    home_dir()
        .map(|h| h.join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<PathBuf> {
        None
    }

    #[test]
    fn defaults_when_no_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = AppConfig::resolve(&dir.path().join(CONFIG_FILE_NAME), no_env).unwrap();
        assert_eq!(config.input_path, PathBuf::from("output.csv"));
        assert!(config.output_dir.ends_with("Downloads"));
        assert_eq!(config.window_size, [1200.0, 800.0]);
    }

    #[test]
    fn file_overrides_defaults_partially() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "input_path": "data/towns.parquet" }"#).unwrap();

        let config = AppConfig::resolve(&path, no_env).unwrap();
        assert_eq!(config.input_path, PathBuf::from("data/towns.parquet"));
        assert!(config.output_dir.ends_with("Downloads"));
    }

    #[test]
    fn environment_beats_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "input_path": "a.csv", "output_dir": "/tmp/a" }"#).unwrap();

        let config = AppConfig::resolve(&path, |key| match key {
            ENV_OUTPUT_DIR => Some(PathBuf::from("/tmp/b")),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.input_path, PathBuf::from("a.csv"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/b"));
    }

    #[test]
    fn invalid_json_is_reported_with_path() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::resolve(&path, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn empty_paths_are_rejected() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "output_dir": "" }"#).unwrap();

        let err = AppConfig::resolve(&path, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Empty { field: "output_dir" }));
    }
}
