//! Integration tests for ephemeral node handling

use zkcopy::client::Coordinator;
use zkcopy::MemoryEnsemble;

use crate::integration::{options, read, seed_app_tree, write};

async fn source_with_ephemeral() -> MemoryEnsemble {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    let session = source.session();
    session
        .create_ephemeral("/app/services/api/lock", Some(b"session-owner"))
        .await
        .unwrap();
    source
}

/// Test that ephemeral nodes are skipped when ignored
#[tokio::test]
async fn test_ephemeral_absent_when_ignored() {
    let source = source_with_ephemeral().await;
    let target = MemoryEnsemble::new();

    let tree = read(&source, "/app", 3).await.unwrap();
    assert!(tree.get("/app/services/api/lock").unwrap().ephemeral);

    let summary = write(&target, "/app", &tree, options(true, true)).await.unwrap();

    assert_eq!(summary.skipped_ephemeral, 1);
    assert!(!target.contains("/app/services/api/lock"));
    assert!(target.contains("/app/services/api"));
}

/// Test that ephemeral nodes are copied, as persistent nodes, when not ignored
#[tokio::test]
async fn test_ephemeral_present_when_not_ignored() {
    let source = source_with_ephemeral().await;
    let target = MemoryEnsemble::new();

    let tree = read(&source, "/app", 3).await.unwrap();
    let summary = write(&target, "/app", &tree, options(true, false)).await.unwrap();

    assert_eq!(summary.skipped_ephemeral, 0);
    assert_eq!(
        target.payload("/app/services/api/lock"),
        Some(Some(b"session-owner".to_vec()))
    );
    assert!(!target.is_ephemeral("/app/services/api/lock"));
}

/// Test that an expired ephemeral owner is reflected in the next snapshot
#[tokio::test]
async fn test_expired_ephemeral_not_in_snapshot() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    let session = source.session();
    session
        .create_ephemeral("/app/services/worker/lease", None)
        .await
        .unwrap();
    assert!(session.exists("/app/services/worker/lease").await.unwrap().is_some());

    source.expire_session(session.session_id());
    let tree = read(&source, "/app", 2).await.unwrap();
    assert!(tree.get("/app/services/worker/lease").is_none());
}
