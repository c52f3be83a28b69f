//! Integration tests for incremental synchronization of an existing target

use zkcopy::MemoryEnsemble;

use crate::integration::{ensemble_contents, options, read, seed_app_tree, write};

/// Test that a second write with the same snapshot changes nothing
#[tokio::test]
async fn test_second_write_is_idempotent() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    let target = MemoryEnsemble::new();

    let tree = read(&source, "/app", 4).await.unwrap();
    write(&target, "/app", &tree, options(true, true)).await.unwrap();
    let before = ensemble_contents(&target, "/app");
    target.reset_mutations();

    let summary = write(&target, "/app", &tree, options(true, true)).await.unwrap();

    assert_eq!(summary.changes(), 0);
    assert_eq!(summary.unchanged, 7);
    assert_eq!(target.mutations().total(), 0);
    assert_eq!(ensemble_contents(&target, "/app"), before);
}

/// Test that a payload change is applied in place, not by delete and create
#[tokio::test]
async fn test_payload_update_without_recreate() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    source.insert("/app/config/db", Some(b"v1"));
    let target = MemoryEnsemble::new();

    let tree = read(&source, "/app", 4).await.unwrap();
    write(&target, "/app", &tree, options(true, true)).await.unwrap();
    let version_before = target.version("/app/config/db").unwrap();

    source.insert("/app/config/db", Some(b"v2"));
    target.reset_mutations();
    let tree = read(&source, "/app", 4).await.unwrap();
    let summary = write(&target, "/app", &tree, options(true, true)).await.unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(target.payload("/app/config/db"), Some(Some(b"v2".to_vec())));
    assert_eq!(target.version("/app/config/db"), Some(version_before + 1));
    let mutations = target.mutations();
    assert_eq!(mutations.updates, 1);
    assert_eq!(mutations.creates, 0);
    assert_eq!(mutations.deletes, 0);
}

/// Test that new source nodes are added under existing target nodes
#[tokio::test]
async fn test_new_source_nodes_are_created() {
    let source = MemoryEnsemble::new();
    seed_app_tree(&source);
    let target = MemoryEnsemble::new();

    let tree = read(&source, "/app", 2).await.unwrap();
    write(&target, "/app", &tree, options(true, true)).await.unwrap();

    source.insert("/app/services/scheduler/leader", Some(b"node-3"));
    let tree = read(&source, "/app", 2).await.unwrap();
    let summary = write(&target, "/app", &tree, options(true, true)).await.unwrap();

    assert_eq!(summary.created, 2);
    assert_eq!(
        target.payload("/app/services/scheduler/leader"),
        Some(Some(b"node-3".to_vec()))
    );
}
