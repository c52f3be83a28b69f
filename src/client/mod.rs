//! Coordination service client boundary
//!
//! The engine talks to both clusters through [`Coordinator`]. The production
//! implementation is a ZooKeeper session kept alive by [`Reconnecting`];
//! [`memory::MemoryEnsemble`] serves the same contract in-process for tests.

use crate::error::ClientError;
use async_trait::async_trait;

pub mod memory;
pub mod retry;
pub mod session;
pub mod zookeeper;

pub use memory::{MemoryEnsemble, MemorySession};
pub use retry::{retry, RetryConfig};
pub use session::{Connector, Reconnecting};
pub use zookeeper::{ZooKeeperConnector, ZooKeeperCoordinator};

/// Node metadata the engine cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStat {
    /// Data version, used as the expected version for conditional writes
    pub version: i32,
    /// Whether the node is owned by a session
    pub ephemeral: bool,
}

/// Session-based client operations against one cluster
///
/// Implementations must be safe to share across read workers.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Stat of the node, or `None` if it does not exist
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, ClientError>;

    /// Payload and stat of the node
    async fn get_data(&self, path: &str) -> Result<(Option<Vec<u8>>, NodeStat), ClientError>;

    /// Names of the node's children, unordered
    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError>;

    /// Create a persistent node; the parent must exist
    async fn create(&self, path: &str, payload: Option<&[u8]>) -> Result<(), ClientError>;

    /// Replace the payload if the node is still at `expected_version`
    async fn set_data(
        &self,
        path: &str,
        payload: Option<&[u8]>,
        expected_version: Option<i32>,
    ) -> Result<NodeStat, ClientError>;

    /// Delete a childless node if it is still at `expected_version`
    async fn delete(&self, path: &str, expected_version: Option<i32>) -> Result<(), ClientError>;

    /// Human-readable description of the cluster, for logs
    fn describe(&self) -> String;
}
