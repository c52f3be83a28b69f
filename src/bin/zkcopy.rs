//! zkcopy CLI Binary
//!
//! Copies a ZooKeeper subtree from a source cluster to a target cluster.

use clap::{CommandFactory, Parser};
use std::process;
use tracing::{error, info};
use zkcopy::cli::{format_summary, map_error, Cli};
use zkcopy::error::{ConfigError, CopyError};
use zkcopy::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e @ (ConfigError::MissingSource | ConfigError::MissingTarget)) = config.validate() {
        error!("{}", e);
        let _ = Cli::command().print_help();
        process::exit(2);
    }

    match zkcopy::copy::copy(&config).await {
        Ok(summary) => {
            info!("Copy finished successfully");
            println!("{}", format_summary(&summary));
        }
        Err(e) => {
            error!("FAILED: {}", e);
            eprintln!("{}", map_error(&e));
            let code = match e {
                CopyError::Config(_) => 2,
                _ => 1,
            };
            process::exit(code);
        }
    }
}
