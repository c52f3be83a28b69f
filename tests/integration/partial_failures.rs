//! Integration tests for read and write failure handling

use std::sync::Arc;
use zkcopy::client::RetryConfig;
use zkcopy::copy::copy_with;
use zkcopy::error::{ClientError, CopyError, ReadError, WriteError};
use zkcopy::{CopyConfig, MemoryEnsemble};

use crate::integration::{options, read, seed, seed_app_tree, write};

fn config() -> CopyConfig {
    CopyConfig {
        source: Some("source:2181/app".to_string()),
        target: Some("target:2181/app".to_string()),
        workers: 4,
        retry: RetryConfig::testing(),
        ..CopyConfig::default()
    }
}

/// Test that a disconnect mid-traversal fails the read and skips the write
#[tokio::test]
async fn test_disconnect_mid_read_prevents_write() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    source.fail_after(5);
    let target = MemoryEnsemble::new();
    seed(&target, &[("/app/keep", Some("must survive"))]);

    let result = copy_with(
        &config(),
        Arc::new(source.session()),
        Arc::new(target.session()),
    )
    .await;

    assert!(matches!(
        result,
        Err(CopyError::Read(ReadError::Client {
            source: ClientError::ConnectionLoss,
            ..
        }))
    ));
    assert_eq!(target.calls(), 0);
    assert!(target.contains("/app/keep"));
}

/// Test that a transient failure is retried and the read succeeds
#[tokio::test]
async fn test_transient_read_failure_recovers() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    source.fail_after(3);

    let recover = source.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        recover.clear_faults();
    });

    let tree = zkcopy::Reader::new(Arc::new(source.session()), "/app", 1)
        .with_retry(RetryConfig {
            max_attempts: 50,
            initial_delay_ms: 2,
            max_delay_ms: 5,
            backoff_factor: 1.0,
        })
        .read()
        .await
        .unwrap();
    handle.await.unwrap();

    assert_eq!(tree.len(), 7);
}

/// Test that a missing source root is fatal
#[tokio::test]
async fn test_missing_source_root() {
    let source = MemoryEnsemble::new();
    let result = read(&source, "/app", 2).await;
    assert!(matches!(result, Err(ReadError::MissingRoot(_))));
}

/// Test that per-node write failures are aggregated without aborting siblings
#[tokio::test]
async fn test_write_failures_are_aggregated() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    let target = MemoryEnsemble::new();
    target.fail_path_with("/app/config", ClientError::Other("quota exceeded".to_string()));
    target.fail_path("/app/services/worker");

    let tree = read(&source, "/app", 2).await.unwrap();
    let result = write(&target, "/app", &tree, options(true, true)).await;

    let summary = match result {
        Err(WriteError::Incomplete(summary)) => summary,
        other => panic!("expected incomplete write, got {:?}", other),
    };
    let failed: Vec<&str> = summary.failed.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(failed, vec!["/app/config", "/app/services/worker"]);
    assert!(target.contains("/app/services/api"));
    assert!(!target.contains("/app/config/db"));
}

/// Test that a stale node with an undeletable child is reported, not retried forever
#[tokio::test]
async fn test_failed_stale_delete_reported() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    let target = MemoryEnsemble::new();
    seed(&target, &[("/app/stale/pinned", None)]);
    target.fail_path_with("/app/stale/pinned", ClientError::Other("denied".to_string()));

    let tree = read(&source, "/app", 2).await.unwrap();
    let result = write(&target, "/app", &tree, options(true, true)).await;

    let summary = match result {
        Err(WriteError::Incomplete(summary)) => summary,
        other => panic!("expected incomplete write, got {:?}", other),
    };
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].path, "/app/stale/pinned");
    assert!(target.contains("/app/stale"));
    assert_eq!((summary.created, summary.updated), (6, 1));
}
