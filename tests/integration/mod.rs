//! Integration tests for the zkcopy read/write engine

mod config_integration;
mod ephemeral_nodes;
mod partial_failures;
mod session_recovery;
mod sync_updates;

pub use test_utils::*;
