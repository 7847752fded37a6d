//! Pool configuration using Figment.
//!
//! Configuration is loaded from:
//! 1. `config/signal_pool.toml` (base configuration)
//! 2. Environment variables prefixed with `SIGNAL_POOL_`, nested keys split on `__`
//!
//! Every field has a default, so a missing file or section is not an error.
//!
//! # Example
//! ```no_run
//! use signal_pool::config::PoolConfig;
//!
//! let config = PoolConfig::load()?;
//! config.validate()?;
//! println!("Chunk size: {}", config.streaming.default_chunk_size);
//! # Ok::<(), signal_pool::error::PoolError>(())
//! ```

use crate::error::{PoolError, PoolResult};
use crate::validation;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/signal_pool.toml";

/// Top-level pool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// File-backed storage settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Chunked read defaults
    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Folder used for file-backed records when `store`/`convert_to_file` get none
    #[serde(default)]
    pub default_folder: Option<PathBuf>,
    /// Extension of record files, without the dot
    #[serde(default = "default_extension")]
    pub file_extension: String,
    /// Create a missing storage folder instead of failing
    #[serde(default)]
    pub create_missing_folders: bool,
}

/// Streaming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Elements per chunk when the caller does not choose
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,
    /// Window overlap in percent, in [0, 100)
    #[serde(default = "default_overlap")]
    pub default_overlap_percent: f64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_extension() -> String {
    "dat".to_string()
}

fn default_chunk_size() -> usize {
    1024
}

fn default_overlap() -> f64 {
    50.0
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_folder: None,
            file_extension: default_extension(),
            create_missing_folders: false,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: default_chunk_size(),
            default_overlap_percent: default_overlap(),
        }
    }
}

impl PoolConfig {
    /// Load configuration from `config/signal_pool.toml` and environment variables
    ///
    /// Environment variables override the file with prefix `SIGNAL_POOL_`.
    /// Example: `SIGNAL_POOL_STREAMING__DEFAULT_CHUNK_SIZE=4096`
    pub fn load() -> PoolResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> PoolResult<Self> {
        Ok(Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SIGNAL_POOL_").split("__"))
            .extract()?)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> PoolResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(PoolError::InvalidConfiguration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        validation::is_not_empty(&self.storage.file_extension, "file_extension")?;
        if self.storage.file_extension.contains(['/', '\\', '.']) {
            return Err(PoolError::InvalidConfiguration(format!(
                "file_extension '{}' must be a bare extension",
                self.storage.file_extension
            )));
        }
        if let Some(folder) = &self.storage.default_folder {
            if folder.as_os_str().is_empty() {
                return Err(PoolError::InvalidConfiguration(
                    "default_folder cannot be empty".into(),
                ));
            }
        }

        validation::overlap_step(
            self.streaming.default_chunk_size,
            self.streaming.default_overlap_percent,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = PoolConfig::default();
        assert_eq!(config.storage.file_extension, "dat");
        assert_eq!(config.streaming.default_chunk_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_file_fills_missing_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[storage]\ndefault_folder = \"/tmp/pool\"\ncreate_missing_folders = true\n"
        )
        .unwrap();

        let config = PoolConfig::load_from(file.path()).unwrap();
        assert_eq!(config.storage.default_folder, Some(PathBuf::from("/tmp/pool")));
        assert!(config.storage.create_missing_folders);
        assert_eq!(config.storage.file_extension, "dat");
        assert_eq!(config.application.log_level, "info");
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = PoolConfig::default();
        config.application.log_level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = PoolConfig::default();
        config.storage.file_extension = ".dat".into();
        assert!(config.validate().is_err());

        let mut config = PoolConfig::default();
        config.streaming.default_overlap_percent = 100.0;
        assert!(config.validate().is_err());

        let mut config = PoolConfig::default();
        config.streaming.default_chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
