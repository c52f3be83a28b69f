//! zkcopy: ZooKeeper tree replication
//!
//! Reads a complete snapshot of a source subtree with a bounded pool of
//! concurrent workers, then converges a target subtree onto it by creating,
//! updating, and optionally deleting nodes.

pub mod address;
pub mod cli;
pub mod client;
pub mod config;
pub mod copy;
pub mod error;
pub mod logging;
pub mod reader;
pub mod tree;
pub mod writer;

pub use address::ClusterAddress;
pub use client::{Coordinator, MemoryEnsemble};
pub use config::CopyConfig;
pub use reader::Reader;
pub use tree::{Node, NodeTree};
pub use writer::{WriteOptions, WriteSummary, Writer};
