//! Snapshot tree
//!
//! In-memory copy of a source hierarchy. Each node owns its children; the
//! tree owns the root. Built once by the reader and only read afterwards.

pub mod node;
pub mod path;
pub mod snapshot;

pub use node::Node;
pub use snapshot::NodeTree;
