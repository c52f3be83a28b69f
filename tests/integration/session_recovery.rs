//! Integration tests for reading through an expiring session

use std::sync::Arc;
use std::time::Duration;
use zkcopy::client::{Reconnecting, RetryConfig};
use zkcopy::{MemoryEnsemble, Reader};

use crate::integration::{read, seed, seed_app_tree};

fn seed_wide_tree(ensemble: &MemoryEnsemble) {
    seed(ensemble, &[("/wide", Some("root"))]);
    for branch in 0..5 {
        for leaf in 0..4 {
            ensemble.insert(
                &format!("/wide/branch-{}/leaf-{}", branch, leaf),
                Some(format!("{}:{}", branch, leaf).as_bytes()),
            );
        }
    }
}

/// Test that a session expiring mid-read is replaced once and the read completes
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_expiry_mid_read_reconnects_once() {
    let source = MemoryEnsemble::new();
    seed_wide_tree(&source);
    source.set_latency(Duration::from_millis(1));
    let expected = read(&source, "/wide", 1).await.unwrap();

    let client = Arc::new(Reconnecting::open(source.clone()).await.unwrap());
    let opened_before = source.sessions_opened();
    source.expire_after(6);

    let tree = Reader::new(client.clone(), "/wide", 6)
        .with_retry(RetryConfig::testing())
        .read()
        .await
        .unwrap();

    assert_eq!(tree, expected);
    assert_eq!(tree.len(), 1 + 5 + 20);
    assert_eq!(client.generation().await, 1);
    assert_eq!(source.sessions_opened(), opened_before + 1);
}

/// Test that ephemeral nodes of an expired session are gone from the snapshot
#[tokio::test]
async fn test_expiry_drops_session_ephemerals() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    let owner = source.session();
    owner
        .create_ephemeral("/app/services/api/lock", Some(b"owner"))
        .await
        .unwrap();
    let client = Arc::new(Reconnecting::open(source.clone()).await.unwrap());
    source.expire_after(0);

    let tree = Reader::new(client.clone(), "/app", 2)
        .with_retry(RetryConfig::testing())
        .read()
        .await
        .unwrap();

    assert!(tree.get("/app/services/api/lock").is_none());
    assert_eq!(tree.len(), 7);
    assert_eq!(client.generation().await, 1);
}
