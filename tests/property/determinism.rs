//! Property-based tests for copy determinism guarantees

use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use std::collections::BTreeMap;
use std::sync::Arc;
use zkcopy::client::{MemoryEnsemble, RetryConfig};
use zkcopy::tree::{path, NodeTree};
use zkcopy::{Reader, WriteOptions, Writer};

type Contents = BTreeMap<String, Option<Vec<u8>>>;

/// Relative node paths built from a small alphabet so that subtrees overlap
fn node_strategy() -> impl Strategy<Value = BTreeMap<String, Option<Vec<u8>>>> {
    let segment = prop::sample::select(vec!["a", "b", "c", "d"]);
    let relative = prop::collection::vec(segment, 1..4).prop_map(|parts| parts.join("/"));
    let payload = prop::option::of(prop::collection::vec(any::<u8>(), 0..8));
    prop::collection::btree_map(relative, payload, 0..24)
}

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 48,
        ..Config::default()
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn seeded(root: &str, nodes: &BTreeMap<String, Option<Vec<u8>>>) -> MemoryEnsemble {
    let ensemble = MemoryEnsemble::new();
    ensemble.insert(root, Some(b"root"));
    for (relative, payload) in nodes {
        ensemble.insert(&path::join(root, relative), payload.as_deref());
    }
    ensemble
}

fn contents(ensemble: &MemoryEnsemble, root: &str) -> Contents {
    ensemble
        .paths_under(root)
        .into_iter()
        .filter_map(|node_path| {
            let relative = path::rebase(&node_path, root, "/")?;
            Some((relative, ensemble.payload(&node_path)?))
        })
        .collect()
}

async fn read(ensemble: &MemoryEnsemble, root: &str, workers: usize) -> NodeTree {
    Reader::new(Arc::new(ensemble.session()), root, workers)
        .with_retry(RetryConfig::none())
        .read()
        .await
        .unwrap()
}

fn writer(ensemble: &MemoryEnsemble, root: &str) -> Writer {
    Writer::new(Arc::new(ensemble.session()), root, WriteOptions::default())
        .with_retry(RetryConfig::none())
}

/// Test that copying into an empty target reproduces the source exactly
#[test]
fn test_copy_into_empty_matches_source() {
    let rt = runtime();
    runner()
        .run(&node_strategy(), |nodes| {
            let source = seeded("/src", &nodes);
            let target = MemoryEnsemble::new();

            rt.block_on(async {
                let tree = read(&source, "/src", 4).await;
                writer(&target, "/dst").write(&tree).await.unwrap();
            });

            prop_assert_eq!(contents(&target, "/dst"), contents(&source, "/src"));
            Ok(())
        })
        .unwrap();
}

/// Test that a second write of the same snapshot applies no mutations
#[test]
fn test_repeated_write_is_idempotent() {
    let rt = runtime();
    runner()
        .run(&(node_strategy(), node_strategy()), |(source_nodes, target_nodes)| {
            let source = seeded("/src", &source_nodes);
            let target = seeded("/dst", &target_nodes);

            let second = rt.block_on(async {
                let tree = read(&source, "/src", 3).await;
                let writer = writer(&target, "/dst");
                writer.write(&tree).await.unwrap();
                target.reset_mutations();
                writer.write(&tree).await.unwrap()
            });

            prop_assert_eq!(second.changes(), 0);
            prop_assert_eq!(target.mutations().total(), 0);
            prop_assert_eq!(contents(&target, "/dst"), contents(&source, "/src"));
            Ok(())
        })
        .unwrap();
}

/// Test that the snapshot does not depend on the number of workers
#[test]
fn test_snapshot_independent_of_fan_out() {
    let rt = runtime();
    runner()
        .run(&(node_strategy(), 2usize..16), |(nodes, workers)| {
            let source = seeded("/src", &nodes);

            let (sequential, parallel) = rt.block_on(async {
                (read(&source, "/src", 1).await, read(&source, "/src", workers).await)
            });

            prop_assert_eq!(sequential.len(), nodes_with_ancestors(&nodes) + 1);
            prop_assert_eq!(sequential, parallel);
            Ok(())
        })
        .unwrap();
}

/// Distinct relative paths including implicitly created ancestors
fn nodes_with_ancestors(nodes: &BTreeMap<String, Option<Vec<u8>>>) -> usize {
    let mut all = std::collections::BTreeSet::new();
    for relative in nodes.keys() {
        let absolute = path::join("/", relative);
        all.extend(path::ancestors(&absolute));
        all.insert(absolute);
    }
    all.len()
}
