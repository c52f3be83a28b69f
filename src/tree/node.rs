//! Snapshot node types

use crate::tree::path;
use std::collections::BTreeMap;

/// One entry of a snapshot: payload, ephemeral flag, and owned children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Fully-qualified path on the source cluster
    pub path: String,
    /// Payload bytes; `None` when the source node carries no data at all
    pub payload: Option<Vec<u8>>,
    /// Children keyed by name, iterated in name order
    pub children: BTreeMap<String, Node>,
    /// Whether the source node is session-scoped
    pub ephemeral: bool,
}

impl Node {
    /// Create a leaf node
    pub fn new(path: impl Into<String>, payload: Option<Vec<u8>>, ephemeral: bool) -> Self {
        Self {
            path: path.into(),
            payload,
            children: BTreeMap::new(),
            ephemeral,
        }
    }

    /// Name of this node within its parent
    pub fn name(&self) -> &str {
        path::name(&self.path)
    }

    /// Attach a finished child subtree.
    ///
    /// The child's path must be this node's path joined with the child's name.
    pub fn attach(&mut self, child: Node) {
        debug_assert_eq!(child.path, path::join(&self.path, child.name()));
        self.children.insert(child.name().to_string(), child);
    }

    /// Builder-style variant of [`Node::attach`]
    pub fn with_child(mut self, child: Node) -> Self {
        self.attach(child);
        self
    }
}
