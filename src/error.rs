//! Error types for the document graph client

use crate::graph::types::{Checksum256, Name};
use thiserror::Error;

/// Errors that can occur while decoding, querying or synchronizing the graph
#[derive(Error, Debug)]
pub enum DocGraphError {
    /// A variant tag or discriminant outside the FlexValue table
    #[error("Unknown FlexValue variant: {0}")]
    UnknownVariant(String),

    /// Typed accessor used on a value holding another variant
    #[error("Invalid type for value {value:?}: expected {expected}, found {found}")]
    InvalidType {
        value: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Content label not found: {label} in document: {document_hash}")]
    ContentNotFound {
        label: String,
        document_hash: Checksum256,
    },

    #[error("Document not found: {0}")]
    DocumentNotFound(Checksum256),

    #[error("Edge not found: {from} --{edge_name}--> {to}")]
    EdgeNotFound {
        from: Checksum256,
        to: Checksum256,
        edge_name: Name,
    },

    #[error("No document with edge: {0}")]
    NoDocumentWithEdge(Name),

    /// Retries exhausted against a transient failure
    #[error("Remote unavailable after {attempts} attempts: {last_error}")]
    RemoteUnavailable { attempts: u32, last_error: String },

    /// Network failure or remote 5xx; retried by the access layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// The ledger conclusively refused an action or request
    #[error("Rejected by ledger ({action}): {message}")]
    Rejected { action: String, message: String },

    /// A freshly read document does not hold the content that was submitted
    #[error("Content mismatch: document {0} does not hold the submitted content")]
    ContentMismatch(Checksum256),

    #[error("Pagination stalled on table {table} at cursor {cursor}")]
    PaginationStalled { table: String, cursor: u64 },

    /// Malformed binary payload
    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid checksum256: {0}")]
    InvalidHash(String),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocGraphError {
    /// Whether the access layer may retry the failed call
    pub fn is_transient(&self) -> bool {
        matches!(self, DocGraphError::Transport(_))
    }

    /// Not-found errors that callers routinely branch on
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocGraphError::ContentNotFound { .. }
                | DocGraphError::DocumentNotFound(_)
                | DocGraphError::EdgeNotFound { .. }
                | DocGraphError::NoDocumentWithEdge(_)
        )
    }
}

impl From<reqwest::Error> for DocGraphError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DocGraphError::Codec(e.to_string())
        } else {
            DocGraphError::Transport(e.to_string())
        }
    }
}

pub type DocGraphResult<T> = Result<T, DocGraphError>;
