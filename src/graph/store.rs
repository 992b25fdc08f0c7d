//! In-memory graph assembled from a full ledger snapshot
//!
//! A [`GraphBuilder`] guards node insertion and edge linking with a single
//! lock so concurrent producers never observe a half-linked edge. Once built,
//! the [`Graph`] is an immutable point-in-time value: readers need no lock,
//! and refreshing means building a new graph.

use super::document::{Document, TYPE_LABEL};
use super::edge::Edge;
use super::node::{Node, NodeIndex};
use super::types::{Checksum256, Name};
use crate::error::{DocGraphError, DocGraphResult};
use rustc_hash::FxHashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Point-in-time projection of all documents and edges
///
/// Nodes live in an arena (`nodes`) indexed by hash (`index`); adjacency is
/// stored as [`NodeIndex`] pairs inside each [`Node`].
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: FxHashMap<Checksum256, NodeIndex>,
    /// Edges whose endpoints were not in the document set
    dangling: Vec<Edge>,
}

impl Graph {
    /// Assemble a graph from fetched documents and edges
    pub fn from_parts(documents: Vec<Document>, edges: Vec<Edge>) -> Self {
        let builder = GraphBuilder::with_capacity(documents.len(), edges.len());
        for document in documents {
            builder.add_node(document);
        }
        for edge in edges {
            builder.connect(edge);
        }
        builder.build()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in retrieval order, including dangling ones
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges skipped during linking because an endpoint was missing
    pub fn dangling_edges(&self) -> &[Edge] {
        &self.dangling
    }

    pub fn index_of(&self, hash: &Checksum256) -> Option<NodeIndex> {
        self.index.get(hash).copied()
    }

    pub fn node(&self, hash: &Checksum256) -> Option<&Node> {
        self.index_of(hash).map(|i| &self.nodes[i.0])
    }

    pub fn node_at(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.0)
    }

    /// Documents `hash` points to over edges named `edge_name`
    pub fn outbound(&self, hash: &Checksum256, edge_name: &Name) -> Vec<&Node> {
        self.node(hash)
            .map(|node| self.resolve(node.outbound(edge_name)))
            .unwrap_or_default()
    }

    /// Documents pointing to `hash` over edges named `edge_name`
    pub fn inbound(&self, hash: &Checksum256, edge_name: &Name) -> Vec<&Node> {
        self.node(hash)
            .map(|node| self.resolve(node.inbound(edge_name)))
            .unwrap_or_default()
    }

    fn resolve(&self, indices: &[NodeIndex]) -> Vec<&Node> {
        indices.iter().filter_map(|i| self.nodes.get(i.0)).collect()
    }

    /// Exact triple membership over the edge set
    pub fn edge_exists(&self, from: &Checksum256, to: &Checksum256, edge_name: &Name) -> bool {
        self.edges.iter().any(|e| e.matches(from, to, edge_name))
    }

    /// Documents whose first `type` item equals `doc_type`
    ///
    /// Documents without a `type` item are left out.
    pub fn documents_of_type(&self, doc_type: &Name) -> Vec<&Document> {
        self.nodes
            .iter()
            .map(Node::document)
            .filter(|doc| matches_type(doc, doc_type))
            .collect()
    }

    /// Target document of the newest edge named `edge_name`
    ///
    /// When that edge is dangling the result is `DocumentNotFound` for its
    /// target; older edges with the same name are not consulted.
    pub fn last_document_of_edge(&self, edge_name: &Name) -> DocGraphResult<&Document> {
        let edge = self
            .edges
            .iter()
            .rev()
            .find(|e| e.edge_name == *edge_name)
            .ok_or_else(|| DocGraphError::NoDocumentWithEdge(edge_name.clone()))?;
        self.node(&edge.to_node)
            .map(Node::document)
            .ok_or(DocGraphError::DocumentNotFound(edge.to_node))
    }
}

/// `type` item compared by string projection, so names stored as strings match
pub(crate) fn matches_type(document: &Document, doc_type: &Name) -> bool {
    document
        .get_content(TYPE_LABEL)
        .map(|value| value.to_string() == doc_type.as_str())
        .unwrap_or(false)
}

/// Lock-guarded assembly of a [`Graph`]
#[derive(Debug, Default)]
pub struct GraphBuilder {
    state: RwLock<Graph>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        let mut index = FxHashMap::default();
        index.reserve(nodes);
        GraphBuilder {
            state: RwLock::new(Graph {
                nodes: Vec::with_capacity(nodes),
                edges: Vec::with_capacity(edges),
                index,
                dangling: Vec::new(),
            }),
        }
    }

    /// Add a document; a repeated hash keeps the first node
    pub fn add_node(&self, document: Document) -> NodeIndex {
        let mut graph = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = graph.index.get(&document.hash) {
            warn!("Duplicate document {} ignored", document.hash);
            return *existing;
        }
        debug!("Adding node --- {}", document.node_label());
        let index = NodeIndex(graph.nodes.len());
        graph.index.insert(document.hash, index);
        graph.nodes.push(Node::new(document));
        index
    }

    /// Link `from -> to` under the edge name; false when an endpoint is unknown
    pub fn connect(&self, edge: Edge) -> bool {
        let mut graph = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let endpoints = (
            graph.index.get(&edge.from_node).copied(),
            graph.index.get(&edge.to_node).copied(),
        );
        let (from, to) = match endpoints {
            (Some(from), Some(to)) => (from, to),
            _ => {
                warn!(
                    "Skipping edge {} --{}--> {}: endpoint not in document set",
                    edge.from_node, edge.edge_name, edge.to_node
                );
                graph.dangling.push(edge.clone());
                graph.edges.push(edge);
                return false;
            }
        };

        debug!(
            "Connecting ---- {} --- {} ---> {}",
            graph.nodes[from.0].document().node_label(),
            edge.edge_name,
            graph.nodes[to.0].document().node_label()
        );
        graph.nodes[from.0].link_outbound(edge.edge_name.clone(), to);
        graph.nodes[to.0].link_inbound(edge.edge_name.clone(), from);
        graph.edges.push(edge);
        true
    }

    pub fn node_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).nodes.len()
    }

    pub fn build(self) -> Graph {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
