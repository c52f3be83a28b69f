//! CLI parse: clap types for zkcopy.

use crate::config::{ConfigLoader, CopyConfig};
use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;

/// Copy a ZooKeeper subtree from one cluster to another
#[derive(Debug, Parser)]
#[command(name = "zkcopy")]
#[command(about = "Copy and synchronize ZooKeeper trees between clusters")]
pub struct Cli {
    /// Location of a source tree to copy
    #[arg(short, long, value_name = "server:port/path")]
    pub source: Option<String>,

    /// Target location
    #[arg(short, long, value_name = "server:port/path")]
    pub target: Option<String>,

    /// Number of concurrent workers to copy data
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Do not remove target nodes that were removed on the source
    #[arg(short, long, alias = "copyOnly", value_name = "true|false")]
    pub copy_only: Option<bool>,

    /// Do not copy ephemeral nodes
    #[arg(short, long, alias = "ignoreEphemeralNodes", value_name = "true|false")]
    pub ignore_ephemeral_nodes: Option<bool>,

    /// Configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

impl Cli {
    /// Load layered configuration and apply flags on top.
    /// Precedence: flags override environment override config file override defaults.
    pub fn into_config(self) -> Result<CopyConfig, ConfigError> {
        let config = ConfigLoader::load(self.config.as_deref())?;
        Ok(self.apply(config))
    }

    fn apply(self, mut config: CopyConfig) -> CopyConfig {
        if let Some(source) = self.source {
            config.source = Some(source);
        }
        if let Some(target) = self.target {
            config.target = Some(target);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(copy_only) = self.copy_only {
            config.copy_only = copy_only;
        }
        if let Some(ignore) = self.ignore_ephemeral_nodes {
            config.ignore_ephemeral = ignore;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        config
    }
}
