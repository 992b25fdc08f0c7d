//! Graph node: a document plus its adjacency, keyed by edge name
//!
//! Neighbors are stored as [`NodeIndex`] positions in the owning
//! [`Graph`](super::store::Graph) arena, so cycles between documents never
//! become ownership cycles.

use super::document::Document;
use super::types::{Checksum256, Name};
use indexmap::IndexMap;
use std::fmt;

/// Dense position of a node in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIndex({})", self.0)
    }
}

/// A document in an assembled graph
///
/// Within one edge-name bucket, neighbors keep retrieval order.
#[derive(Debug, Clone)]
pub struct Node {
    document: Document,
    outbound_edges: IndexMap<Name, Vec<NodeIndex>>,
    inbound_edges: IndexMap<Name, Vec<NodeIndex>>,
}

impl Node {
    pub fn new(document: Document) -> Self {
        Node {
            document,
            outbound_edges: IndexMap::new(),
            inbound_edges: IndexMap::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn hash(&self) -> &Checksum256 {
        &self.document.hash
    }

    /// Neighbors this node points to, by edge name
    pub fn outbound_edges(&self) -> &IndexMap<Name, Vec<NodeIndex>> {
        &self.outbound_edges
    }

    /// Neighbors pointing to this node, by edge name
    pub fn inbound_edges(&self) -> &IndexMap<Name, Vec<NodeIndex>> {
        &self.inbound_edges
    }

    pub fn outbound(&self, edge_name: &Name) -> &[NodeIndex] {
        self.outbound_edges.get(edge_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn inbound(&self, edge_name: &Name) -> &[NodeIndex] {
        self.inbound_edges.get(edge_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_degree(&self) -> usize {
        self.outbound_edges.values().map(Vec::len).sum()
    }

    pub fn in_degree(&self) -> usize {
        self.inbound_edges.values().map(Vec::len).sum()
    }

    pub(crate) fn link_outbound(&mut self, edge_name: Name, to: NodeIndex) {
        self.outbound_edges.entry(edge_name).or_default().push(to);
    }

    pub(crate) fn link_inbound(&mut self, edge_name: Name, from: NodeIndex) {
        self.inbound_edges.entry(edge_name).or_default().push(from);
    }
}
