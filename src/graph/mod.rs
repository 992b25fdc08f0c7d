//! Document graph data model
//!
//! This module implements the content-addressed graph:
//! - Typed content values with a fixed variant table ([`FlexValue`])
//! - Labeled content grouped into ordered sections ([`ContentGroup`])
//! - Hash-identified documents and directed, named edges
//! - An in-memory arena graph assembled from a ledger snapshot ([`Graph`])

pub mod codec;
pub mod content;
pub mod document;
pub mod edge;
pub mod node;
pub mod store;
pub mod types;
pub mod value;

// Re-export main types
pub use codec::{Pack, Unpack};
pub use content::{ContentGroup, ContentItem, CONTENT_GROUP_LABEL};
pub use document::{Certificate, Document, NODE_LABEL, SYSTEM_GROUP, TYPE_LABEL};
pub use edge::Edge;
pub use node::{Node, NodeIndex};
pub use store::{Graph, GraphBuilder};
pub use types::{Asset, Checksum256, Name, Symbol, TimePoint};
pub use value::{FlexValue, VariantDef, VARIANTS};
