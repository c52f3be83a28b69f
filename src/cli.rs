//! CLI domain: argument parsing and result presentation only.
//! Orchestration lives in [`crate::copy`].

mod output;
mod parse;

pub use output::{format_summary, map_error};
pub use parse::Cli;
