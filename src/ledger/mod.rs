//! Ledger access: the remote boundary of the document graph
//!
//! The ledger is seen only through paginated table reads and action
//! submission ([`LedgerClient`]). [`HttpLedger`] talks to a chain node,
//! [`MemoryLedger`] keeps the tables in process.

pub mod action;
pub mod client;
pub mod config;
pub mod http;
pub mod memory;
pub mod retry;

pub use action::{Action, ActionData, PermissionLevel, TransactionRef};
pub use client::{KeyType, LedgerClient, TableRequest, TableRows, DOCUMENTS_TABLE, EDGES_TABLE};
pub use config::{LedgerConfig, RetryConfig};
pub use http::HttpLedger;
pub use memory::{content_hash, MemoryLedger};
pub use retry::with_retry;
