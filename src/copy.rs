//! Copy orchestration: read the whole source, then write the target
//!
//! The two phases are strictly sequential. No target call is made until
//! the snapshot is complete, and a failed read never reaches the writer.

use crate::client::{Coordinator, ZooKeeperCoordinator};
use crate::config::CopyConfig;
use crate::error::CopyError;
use crate::reader::Reader;
use crate::writer::{WriteSummary, Writer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// Result of a successful copy run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySummary {
    pub nodes_read: usize,
    pub write: WriteSummary,
    pub elapsed: Duration,
}

/// Run a full copy against live clusters described by `config`
pub async fn copy(config: &CopyConfig) -> Result<CopySummary, CopyError> {
    config.validate()?;
    let source_address = config.source_address()?;
    let target_address = config.target_address()?;

    let source = ZooKeeperCoordinator::connect(&source_address.connect, config.session_timeout())
        .await
        .map_err(CopyError::Connect)?;
    let source: Arc<dyn Coordinator> = Arc::new(source);

    // The target session is opened lazily so a failed read never touches it
    let target_connect = target_address.connect.clone();
    let session_timeout = config.session_timeout();
    run(config, source, move || async move {
        let target = ZooKeeperCoordinator::connect(&target_connect, session_timeout)
            .await
            .map_err(CopyError::Connect)?;
        Ok::<_, CopyError>(Arc::new(target) as Arc<dyn Coordinator>)
    })
    .await
}

/// Run a full copy with caller-supplied clients
///
/// The roots still come from the source and target addresses in `config`;
/// their connect strings are ignored.
pub async fn copy_with(
    config: &CopyConfig,
    source: Arc<dyn Coordinator>,
    target: Arc<dyn Coordinator>,
) -> Result<CopySummary, CopyError> {
    config.validate()?;
    run(config, source, move || async move { Ok::<_, CopyError>(target) }).await
}

#[instrument(skip_all, fields(source = %source.describe()))]
async fn run<F, Fut>(
    config: &CopyConfig,
    source: Arc<dyn Coordinator>,
    connect_target: F,
) -> Result<CopySummary, CopyError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Arc<dyn Coordinator>, CopyError>>,
{
    let start = Instant::now();
    let source_address = config.source_address()?;
    let target_address = config.target_address()?;

    info!(workers = config.workers, "Using concurrent workers to copy data");
    info!(delete_stale = config.delete_stale(), "Stale node deletion");
    info!(ignore_ephemeral = config.ignore_ephemeral, "Ephemeral node handling");

    let reader = Reader::new(source, source_address.root.clone(), config.workers)
        .with_retry(config.retry.clone());
    let tree = match reader.read().await {
        Ok(tree) => tree,
        Err(e) => {
            error!(error = %e, "Read failed, nothing written");
            return Err(e.into());
        }
    };
    let nodes_read = tree.len();

    let target = connect_target().await?;
    let writer = Writer::new(target, target_address.root.clone(), config.write_options())
        .with_retry(config.retry.clone());
    let write = match writer.write(&tree).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Write did not complete");
            return Err(e.into());
        }
    };

    let elapsed = start.elapsed();
    info!(
        nodes_read,
        changes = write.changes(),
        duration_ms = elapsed.as_millis() as u64,
        "Copy completed"
    );
    Ok(CopySummary {
        nodes_read,
        write,
        elapsed,
    })
}
