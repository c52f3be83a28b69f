//! Immutable snapshot of a source hierarchy

use crate::tree::node::Node;

/// A complete, read-only copy of a source tree rooted at a configured path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTree {
    root: Node,
}

impl NodeTree {
    /// Wrap a finished root node
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Path of the root node on the source cluster
    pub fn root_path(&self) -> &str {
        &self.root.path
    }

    /// Total number of nodes, root included
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// A tree always holds at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Depth-first, pre-order traversal with children in name order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![&self.root],
        }
    }

    /// Look up a node by its full source path
    pub fn get(&self, target: &str) -> Option<&Node> {
        let relative = if self.root.path == "/" {
            target.strip_prefix('/')?
        } else if target == self.root.path {
            return Some(&self.root);
        } else {
            target
                .strip_prefix(self.root.path.as_str())?
                .strip_prefix('/')?
        };
        if relative.is_empty() {
            return Some(&self.root);
        }
        relative
            .split('/')
            .try_fold(&self.root, |node, name| node.children.get(name))
    }

    /// Number of levels below the root (0 for a lone root)
    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            node.children
                .values()
                .map(|child| 1 + depth_of(child))
                .max()
                .unwrap_or(0)
        }
        depth_of(&self.root)
    }
}

/// Depth-first iterator over a [`NodeTree`]
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse so the smallest name is visited first
        self.stack.extend(node.children.values().rev());
        Some(node)
    }
}
