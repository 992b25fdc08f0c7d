//! DocGraph
//!
//! Client core for a content-addressed document graph kept in a ledger.
//! Documents are immutable, hash-identified bundles of typed content; edges
//! are directed, named relations between document hashes.
//!
//! # Layers
//!
//! - [`graph`]: the data model (`FlexValue`, content groups, documents, edges),
//!   its JSON and binary wire forms, and the in-memory [`Graph`] assembled
//!   from a ledger snapshot
//! - [`ledger`]: the remote boundary, a [`LedgerClient`] trait with an HTTP
//!   implementation and an in-process [`MemoryLedger`]
//! - [`client`]: [`DocGraph`], the paginated reads, edge traversal and
//!   document actions against one contract, with retry and cancellation
//!
//! ## Example Usage
//!
//! ```rust
//! use docgraph::{ContentGroup, DocGraph, LedgerConfig, MemoryLedger, Name};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> docgraph::DocGraphResult<()> {
//! let contract = Name::new("dao.hypha")?;
//! let config = LedgerConfig::new("http://127.0.0.1:8888", contract.clone());
//! let docgraph = DocGraph::new(MemoryLedger::new(contract), &config);
//! let cancel = CancellationToken::new();
//!
//! let alice = Name::new("alice")?;
//! let badge = docgraph
//!     .create_document(
//!         &alice,
//!         vec![ContentGroup::labeled("system").with("type", Name::new("badge")?)],
//!         &cancel,
//!     )
//!     .await?;
//! assert_eq!(badge.get_type()?.as_str(), "badge");
//!
//! let graph = docgraph.load_graph(&cancel).await?;
//! assert_eq!(graph.node_count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod graph;
pub mod ledger;

pub use client::{DocGraph, EdgeDirection, EdgeScan};
pub use error::{DocGraphError, DocGraphResult};
pub use graph::{
    Asset, Certificate, Checksum256, ContentGroup, ContentItem, Document, Edge, FlexValue, Graph, GraphBuilder, Name,
    Node, NodeIndex, TimePoint,
};
pub use ledger::{HttpLedger, LedgerClient, LedgerConfig, MemoryLedger, RetryConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
