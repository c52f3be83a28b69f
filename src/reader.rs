//! Snapshot reader
//!
//! Walks a source tree and assembles a [`NodeTree`]. Every child subtree is
//! read by its own task; a semaphore with `workers` permits bounds how many
//! fetches are in flight against the source cluster at once. A parent task
//! is the only writer of its node's children: it attaches each finished
//! subtree as the task completes.
//!
//! The read is all-or-nothing. The first failed fetch aborts the outstanding
//! tasks and the whole read returns an error.

use crate::client::{retry, Coordinator, RetryConfig};
use crate::error::{ClientError, ReadError};
use crate::tree::{path, Node, NodeTree};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, trace};

/// Default number of concurrent read workers
pub const DEFAULT_WORKERS: usize = 10;

/// Reads a consistent-as-possible snapshot of a source subtree
pub struct Reader {
    client: Arc<dyn Coordinator>,
    root: String,
    workers: usize,
    retry: RetryConfig,
}

/// State shared by all read tasks of one pass
struct ReadContext {
    client: Arc<dyn Coordinator>,
    permits: Semaphore,
    retry: RetryConfig,
    skip_reserved: bool,
    nodes_read: AtomicUsize,
}

/// A fetched node before its children are read
struct Fetched {
    node: Node,
    children: Vec<String>,
}

impl Reader {
    /// Create a reader for the subtree at `root`
    pub fn new(client: Arc<dyn Coordinator>, root: impl Into<String>, workers: usize) -> Self {
        Self {
            client,
            root: path::normalize_path_string(&root.into()),
            workers: workers.max(1),
            retry: RetryConfig::default(),
        }
    }

    /// Set the retry policy for individual fetches
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Read the complete subtree
    ///
    /// Returns [`ReadError::MissingRoot`] if the root does not exist, or the
    /// first fetch error once its retries are exhausted. No partial tree is
    /// ever returned.
    #[instrument(skip(self), fields(source = %self.client.describe(), root = %self.root, workers = self.workers))]
    pub async fn read(&self) -> Result<NodeTree, ReadError> {
        let start = Instant::now();
        info!("Starting snapshot read");

        let context = Arc::new(ReadContext {
            client: Arc::clone(&self.client),
            permits: Semaphore::new(self.workers),
            retry: self.retry.clone(),
            skip_reserved: !path::is_reserved(&self.root),
            nodes_read: AtomicUsize::new(0),
        });

        let root = match read_subtree(Arc::clone(&context), self.root.clone()).await {
            Ok(Some(root)) => root,
            Ok(None) => {
                error!("Source root does not exist");
                return Err(ReadError::MissingRoot(self.root.clone()));
            }
            Err(e) => {
                error!(error = %e, "Snapshot read failed");
                return Err(e);
            }
        };

        let tree = NodeTree::new(root);
        info!(
            node_count = context.nodes_read.load(Ordering::Relaxed),
            depth = tree.depth(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Snapshot read completed"
        );
        Ok(tree)
    }
}

impl ReadContext {
    /// Fetch one node's payload, stat, and child names.
    ///
    /// `None` means the node vanished while the tree was being read.
    async fn fetch(&self, node_path: &str) -> Result<Option<Fetched>, ReadError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ReadError::Worker("read worker pool closed".to_string()))?;

        let data = retry(&self.retry, "get_data", || self.client.get_data(node_path)).await;
        let (payload, stat) = match data {
            Ok(found) => found,
            Err(ClientError::NoNode(_)) => return Ok(None),
            Err(source) => {
                return Err(ReadError::Client {
                    path: node_path.to_string(),
                    source,
                })
            }
        };

        let children = if stat.ephemeral {
            // Ephemeral nodes cannot have children
            Vec::new()
        } else {
            match retry(&self.retry, "get_children", || {
                self.client.get_children(node_path)
            })
            .await
            {
                Ok(children) => children,
                Err(ClientError::NoNode(_)) => return Ok(None),
                Err(source) => {
                    return Err(ReadError::Client {
                        path: node_path.to_string(),
                        source,
                    })
                }
            }
        };

        self.nodes_read.fetch_add(1, Ordering::Relaxed);
        trace!(
            path = node_path,
            ephemeral = stat.ephemeral,
            children = children.len(),
            "Fetched node"
        );

        Ok(Some(Fetched {
            node: Node::new(node_path, payload, stat.ephemeral),
            children,
        }))
    }
}

/// Read `node_path` and everything below it.
fn read_subtree(
    context: Arc<ReadContext>,
    node_path: String,
) -> BoxFuture<'static, Result<Option<Node>, ReadError>> {
    async move {
        let Some(Fetched { mut node, children }) = context.fetch(&node_path).await? else {
            debug!(path = %node_path, "Node disappeared during read, skipping");
            return Ok(None);
        };

        let mut pending = JoinSet::new();
        for name in children {
            let child_path = path::join(&node_path, &name);
            if context.skip_reserved && path::is_reserved(&child_path) {
                debug!(path = %child_path, "Skipping reserved namespace");
                continue;
            }
            pending.spawn(read_subtree(Arc::clone(&context), child_path));
        }

        while let Some(joined) = pending.join_next().await {
            let failure = match joined {
                Ok(Ok(Some(child))) => {
                    node.attach(child);
                    continue;
                }
                Ok(Ok(None)) => continue,
                Ok(Err(e)) => e,
                Err(join_error) => ReadError::Worker(join_error.to_string()),
            };
            pending.abort_all();
            while pending.join_next().await.is_some() {}
            return Err(failure);
        }

        Ok(Some(node))
    }
    .boxed()
}
