//! Cluster addresses of the form `host:port[,host:port...]/path`

use crate::error::ConfigError;
use crate::tree::path;
use std::fmt;
use std::str::FromStr;

/// A parsed cluster address: where to connect and which subtree to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAddress {
    /// Connect string handed to the client (`host:port[,host:port...]`)
    pub connect: String,
    /// Root path of the subtree, normalized
    pub root: String,
}

impl ClusterAddress {
    pub fn new(connect: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            connect: connect.into(),
            root: path::normalize_path_string(&root.into()),
        }
    }
}

impl FromStr for ClusterAddress {
    type Err = ConfigError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = address.trim();
        let (connect, root) = match trimmed.find('/') {
            Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
            None => (trimmed, "/"),
        };

        if connect.is_empty() {
            return Err(invalid("missing server:port"));
        }
        if connect.split(',').any(|server| server.trim().is_empty()) {
            return Err(invalid("empty server in connect string"));
        }

        let root = path::normalize_path_string(root);
        path::validate_path(&root).map_err(|e| invalid(&e))?;

        Ok(Self {
            connect: connect.to_string(),
            root,
        })
    }
}

impl fmt::Display for ClusterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.connect, self.root)
    }
}
