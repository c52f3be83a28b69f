//! Target writer
//!
//! Converges a target subtree onto a [`NodeTree`] snapshot. The snapshot root
//! maps onto the target root and every descendant maps by relative path.
//! Walks top-down: each node is created or updated, then its children are
//! processed, then target children with no source counterpart are deleted
//! (when stale deletion is enabled).
//!
//! Failures are per node. A node that cannot be written is recorded in the
//! [`WriteSummary`] and its subtree is skipped; unrelated subtrees proceed.

use crate::client::{retry, Coordinator, RetryConfig};
use crate::error::{ClientError, WriteError};
use crate::tree::{path, Node, NodeTree};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

/// Policy flags for a write pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Delete target nodes that have no counterpart in the snapshot
    pub delete_stale: bool,
    /// Neither create nor update nodes that are ephemeral on the source
    pub ignore_ephemeral: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delete_stale: true,
            ignore_ephemeral: true,
        }
    }
}

/// A node that could not be synchronized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedNode {
    pub path: String,
    pub error: ClientError,
}

/// Outcome counters of a write pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub skipped_ephemeral: usize,
    /// Source nodes that map onto the target's reserved namespace
    pub skipped_reserved: usize,
    pub failed: Vec<FailedNode>,
}

impl WriteSummary {
    /// True when every node was synchronized
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of mutations applied to the target
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn record_failure(&mut self, node_path: impl Into<String>, error: ClientError) {
        self.failed.push(FailedNode {
            path: node_path.into(),
            error,
        });
    }
}

/// What happened to a single target node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Created,
    Updated,
    Unchanged,
}

/// Applies a snapshot to a target subtree
pub struct Writer {
    client: Arc<dyn Coordinator>,
    root: String,
    options: WriteOptions,
    retry: RetryConfig,
    skip_reserved: bool,
}

impl Writer {
    /// Create a writer targeting the subtree at `root`
    pub fn new(client: Arc<dyn Coordinator>, root: impl Into<String>, options: WriteOptions) -> Self {
        let root = path::normalize_path_string(&root.into());
        Self {
            client,
            skip_reserved: !path::is_reserved(&root),
            root,
            options,
            retry: RetryConfig::default(),
        }
    }

    /// Set the retry policy for individual target calls
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Write `tree` into the target.
    ///
    /// Returns the summary when every node converged, or
    /// [`WriteError::Incomplete`] carrying the same summary when any node
    /// failed. Changes applied before a failure are kept.
    #[instrument(
        skip(self, tree),
        fields(
            target = %self.client.describe(),
            root = %self.root,
            delete_stale = self.options.delete_stale,
            ignore_ephemeral = self.options.ignore_ephemeral,
        )
    )]
    pub async fn write(&self, tree: &NodeTree) -> Result<WriteSummary, WriteError> {
        let start = Instant::now();
        info!(source_root = tree.root_path(), nodes = tree.len(), "Starting write pass");

        self.ensure_ancestors().await?;

        let mut summary = WriteSummary::default();
        self.sync_node(tree.root(), self.root.clone(), false, &mut summary)
            .await;

        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            deleted = summary.deleted,
            skipped_ephemeral = summary.skipped_ephemeral,
            skipped_reserved = summary.skipped_reserved,
            failed = summary.failed.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Write pass completed"
        );

        if summary.is_clean() {
            Ok(summary)
        } else {
            Err(WriteError::Incomplete(summary))
        }
    }

    /// Create any missing ancestors of the target root with empty payloads
    async fn ensure_ancestors(&self) -> Result<(), WriteError> {
        for ancestor in path::ancestors(&self.root) {
            let existing = retry(&self.retry, "exists", || self.client.exists(&ancestor))
                .await
                .map_err(|source| WriteError::Client {
                    path: ancestor.clone(),
                    source,
                })?;
            if existing.is_some() {
                continue;
            }
            match retry(&self.retry, "create", || self.client.create(&ancestor, None)).await {
                Ok(()) | Err(ClientError::NodeExists(_)) => {
                    debug!(path = %ancestor, "Created target ancestor");
                }
                Err(source) => {
                    return Err(WriteError::Client {
                        path: ancestor,
                        source,
                    })
                }
            }
        }
        Ok(())
    }

    /// Synchronize one source node and its subtree onto `target_path`.
    ///
    /// `parent_created` means the parent was created in this pass, so the
    /// node is expected to be absent and the existence check is skipped.
    fn sync_node<'a>(
        &'a self,
        source: &'a Node,
        target_path: String,
        parent_created: bool,
        summary: &'a mut WriteSummary,
    ) -> BoxFuture<'a, ()> {
        async move {
            if self.options.ignore_ephemeral && source.ephemeral {
                debug!(path = %source.path, "Skipping ephemeral node");
                summary.skipped_ephemeral += 1;
                return;
            }
            if self.skip_reserved && path::is_reserved(&target_path) {
                warn!(
                    source = %source.path,
                    target = %target_path,
                    "Source node maps onto the reserved namespace, not copied"
                );
                summary.skipped_reserved += 1;
                return;
            }

            let applied = match self.apply_node(source, &target_path, parent_created).await {
                Ok(applied) => applied,
                Err(e) => {
                    error!(path = %target_path, error = %e, "Failed to write node, skipping subtree");
                    summary.record_failure(target_path, e);
                    return;
                }
            };
            match applied {
                Applied::Created => summary.created += 1,
                Applied::Updated => summary.updated += 1,
                Applied::Unchanged => summary.unchanged += 1,
            }

            let created = applied == Applied::Created;
            for (name, child) in &source.children {
                let child_path = path::join(&target_path, name);
                self.sync_node(child, child_path, created, summary).await;
            }

            // A node created in this pass has no target-only children
            if self.options.delete_stale && !created {
                self.delete_stale_children(source, &target_path, summary)
                    .await;
            }
        }
        .boxed()
    }

    /// Create or update a single target node
    async fn apply_node(
        &self,
        source: &Node,
        target_path: &str,
        parent_created: bool,
    ) -> Result<Applied, ClientError> {
        let exists = if parent_created {
            false
        } else {
            retry(&self.retry, "exists", || self.client.exists(target_path))
                .await?
                .is_some()
        };

        if !exists {
            let payload = source.payload.as_deref();
            match retry(&self.retry, "create", || self.client.create(target_path, payload)).await {
                Ok(()) => {
                    trace!(path = target_path, "Created node");
                    return Ok(Applied::Created);
                }
                Err(ClientError::NodeExists(_)) => {
                    debug!(path = target_path, "Node appeared concurrently, updating instead");
                }
                Err(e) => return Err(e),
            }
        }

        // The compare and the conditional write are retried together. A write
        // whose reply was lost shows up as a matching payload on the next read.
        let written = &AtomicBool::new(false);
        let client = &self.client;
        retry(&self.retry, "update", move || async move {
            let (current, stat) = client.get_data(target_path).await?;
            if current == source.payload {
                return Ok(if written.load(Ordering::Relaxed) {
                    Applied::Updated
                } else {
                    Applied::Unchanged
                });
            }
            written.store(true, Ordering::Relaxed);
            client
                .set_data(target_path, source.payload.as_deref(), Some(stat.version))
                .await?;
            trace!(path = target_path, version = stat.version, "Updated node payload");
            Ok(Applied::Updated)
        })
        .await
    }

    /// Delete target children of `target_path` missing from `source`
    async fn delete_stale_children(
        &self,
        source: &Node,
        target_path: &str,
        summary: &mut WriteSummary,
    ) {
        let target_children =
            match retry(&self.retry, "get_children", || self.client.get_children(target_path))
                .await
            {
                Ok(children) => children,
                Err(ClientError::NoNode(_)) => return,
                Err(e) => {
                    error!(path = target_path, error = %e, "Failed to list target children");
                    summary.record_failure(target_path, e);
                    return;
                }
            };

        let mut stale: Vec<String> = target_children
            .into_iter()
            .filter(|name| !source.children.contains_key(name))
            .collect();
        stale.sort();

        for name in stale {
            let stale_path = path::join(target_path, &name);
            if self.skip_reserved && path::is_reserved(&stale_path) {
                continue;
            }
            debug!(path = %stale_path, "Deleting stale subtree");
            self.delete_subtree(stale_path, summary).await;
        }
    }

    /// Delete a target subtree depth-first. Returns false if anything in it
    /// could not be deleted.
    fn delete_subtree<'a>(
        &'a self,
        target_path: String,
        summary: &'a mut WriteSummary,
    ) -> BoxFuture<'a, bool> {
        async move {
            let children =
                match retry(&self.retry, "get_children", || self.client.get_children(&target_path))
                    .await
                {
                    Ok(children) => children,
                    Err(ClientError::NoNode(_)) => return true,
                    Err(e) => {
                        error!(path = %target_path, error = %e, "Failed to list stale node");
                        summary.record_failure(target_path, e);
                        return false;
                    }
                };

            let mut complete = true;
            for name in children {
                let child_path = path::join(&target_path, &name);
                complete &= self.delete_subtree(child_path, summary).await;
            }
            if !complete {
                warn!(path = %target_path, "Keeping stale node with undeletable descendants");
                return false;
            }

            match retry(&self.retry, "delete", || self.client.delete(&target_path, None)).await {
                Ok(()) => {
                    trace!(path = %target_path, "Deleted stale node");
                    summary.deleted += 1;
                    true
                }
                Err(ClientError::NoNode(_)) => true,
                Err(e) => {
                    error!(path = %target_path, error = %e, "Failed to delete stale node");
                    summary.record_failure(target_path, e);
                    false
                }
            }
        }
        .boxed()
    }
}
