//! Core types for node identification and validated configuration values

pub mod config;
pub mod pool;
pub mod validated;

pub use config::{
    BuilderCapacity, MaxConnections, MinConnections, Port, RetainedBuilders, duration_ms_serde,
    duration_serde, option_duration_serde,
};
pub use pool::{
    IdleConnections, InUseConnections, LiveConnections, MaxPoolSize, PoolUtilization,
};
pub use validated::{
    BucketName, CollectionName, HostName, NodeName, ScopeName, ValidationError,
};

/// Identifier for cluster data nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a node ID from an index
    /// Marked const fn to allow compile-time evaluation
    #[must_use]
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Get the underlying index
    #[must_use]
    #[inline]
    pub fn as_index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id1 = NodeId::from_index(0);
        let id2 = NodeId::from_index(1);
        assert_ne!(id1, id2);
        assert_eq!(id1.as_index(), 0);
        assert_eq!(id2.as_index(), 1);
    }

    #[test]
    fn test_node_id_from_usize() {
        let id: NodeId = 42.into();
        assert_eq!(id.as_index(), 42);
    }

    #[test]
    fn test_node_id_const_fn() {
        const ID: NodeId = NodeId::from_index(10);
        assert_eq!(ID.as_index(), 10);
    }

    #[test]
    fn test_node_id_display() {
        let id = NodeId::from_index(5);
        assert_eq!(format!("{}", id), "Node(5)");
    }

    #[test]
    fn test_node_id_ordering() {
        let id1 = NodeId::from_index(1);
        let id2 = NodeId::from_index(2);
        assert!(id1 < id2);
    }

    #[test]
    fn test_node_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(NodeId::from_index(1));
        set.insert(NodeId::from_index(1));
        set.insert(NodeId::from_index(2));

        assert_eq!(set.len(), 2);
    }
}
