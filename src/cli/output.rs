//! CLI output: human-readable summaries and error mapping.

use crate::copy::CopySummary;
use crate::error::{CopyError, WriteError};

/// One-line summary of a finished copy
pub fn format_summary(summary: &CopySummary) -> String {
    let write = &summary.write;
    format!(
        "Copied {} node(s) in {} ms: {} created, {} updated, {} unchanged, {} deleted, {} ephemeral skipped, {} reserved skipped",
        summary.nodes_read,
        summary.elapsed.as_millis(),
        write.created,
        write.updated,
        write.unchanged,
        write.deleted,
        write.skipped_ephemeral,
        write.skipped_reserved
    )
}

/// Map an error to the message shown to the user
pub fn map_error(e: &CopyError) -> String {
    match e {
        CopyError::Write(WriteError::Incomplete(summary)) => {
            let mut message = format!("{}; target is partially synced:", e);
            for failure in &summary.failed {
                message.push_str(&format!("\n  - {}: {}", failure.path, failure.error));
            }
            message
        }
        other => other.to_string(),
    }
}
