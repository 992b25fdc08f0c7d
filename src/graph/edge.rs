//! Edge: a directed, named relation between two documents
//!
//! The ledger does not enforce uniqueness of `(from_node, to_node, edge_name)`,
//! so the same triple may appear more than once.

use super::types::{deserialize_u64, Checksum256, Name, TimePoint};
use serde::{Deserialize, Serialize};

/// A directed edge in the document graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Table sequence number
    #[serde(default, deserialize_with = "deserialize_u64")]
    pub id: u64,

    #[serde(default)]
    pub creator: Name,

    /// Source document (edge goes FROM this node)
    pub from_node: Checksum256,

    /// Target document (edge goes TO this node)
    pub to_node: Checksum256,

    pub edge_name: Name,

    #[serde(default)]
    pub created_date: TimePoint,
}

impl Edge {
    pub fn new(from_node: Checksum256, to_node: Checksum256, edge_name: Name) -> Self {
        Edge {
            id: 0,
            creator: Name::default(),
            from_node,
            to_node,
            edge_name,
            created_date: TimePoint::default(),
        }
    }

    /// Exact triple membership
    pub fn matches(&self, from: &Checksum256, to: &Checksum256, edge_name: &Name) -> bool {
        self.from_node == *from && self.to_node == *to && self.edge_name == *edge_name
    }

    /// Check if this edge goes FROM a specific document
    pub fn starts_from(&self, hash: &Checksum256) -> bool {
        self.from_node == *hash
    }

    /// Check if this edge goes TO a specific document
    pub fn ends_at(&self, hash: &Checksum256) -> bool {
        self.to_node == *hash
    }
}
