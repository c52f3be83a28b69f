//! Configuration System
//!
//! A copy run is driven by a single [`CopyConfig`] value, resolved once and
//! passed explicitly into the reader and writer. Sources are layered, lowest
//! precedence first: built-in defaults, an optional TOML file, `ZKCOPY_*`
//! environment variables. Command-line flags are applied on top by the binary.

use crate::address::ClusterAddress;
use crate::client::RetryConfig;
use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::reader::DEFAULT_WORKERS;
use crate::writer::WriteOptions;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Prefix for environment overrides, e.g. `ZKCOPY_WORKERS=4`
pub const ENV_PREFIX: &str = "ZKCOPY";

/// Fully-resolved configuration for one copy run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Source location, `server:port/path`
    pub source: Option<String>,

    /// Target location, `server:port/path`
    pub target: Option<String>,

    /// Number of concurrent read workers
    pub workers: usize,

    /// Keep target nodes that no longer exist on the source
    pub copy_only: bool,

    /// Do not copy ephemeral source nodes
    pub ignore_ephemeral: bool,

    /// Session timeout for both clusters
    pub session_timeout_ms: u64,

    /// Retry policy for individual client calls
    pub retry: RetryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            workers: DEFAULT_WORKERS,
            copy_only: false,
            ignore_ephemeral: true,
            session_timeout_ms: 30_000,
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CopyConfig {
    /// Validate everything that can be checked without a connection
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source_address()?;
        self.target_address()?;
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(self.workers));
        }
        Ok(())
    }

    pub fn source_address(&self) -> Result<ClusterAddress, ConfigError> {
        self.source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSource)?
            .parse()
    }

    pub fn target_address(&self) -> Result<ClusterAddress, ConfigError> {
        self.target
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingTarget)?
            .parse()
    }

    /// Stale target nodes are deleted unless running in copy-only mode
    pub fn delete_stale(&self) -> bool {
        !self.copy_only
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            delete_stale: self.delete_stale(),
            ignore_ephemeral: self.ignore_ephemeral,
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

/// Loads [`CopyConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, then `file` (if given), then environment overrides
    pub fn load(file: Option<&Path>) -> Result<CopyConfig, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            debug!(config_path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: CopyConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
