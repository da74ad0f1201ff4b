use crate::fix_slope::FIX_SLOPE_KEY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for a processing run, read from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Processor keys, run in this order on every ride
    pub processors: Vec<String>,
    pub output_folder: PathBuf,
    /// Worker threads, 0 means one per CPU
    pub threads: usize,
    /// Write a per-sample CSV next to the summary
    pub write_points: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            processors: vec![FIX_SLOPE_KEY.to_string()],
            output_folder: PathBuf::from("fixed"),
            threads: 0,
            write_points: true,
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processors.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one processor must be configured".to_string(),
            ));
        }
        if self.processors.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "Processor keys must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
