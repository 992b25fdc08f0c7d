//! LedgerClient trait and the table-read wire types

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::action::{Action, TransactionRef};
use crate::error::DocGraphResult;
use crate::graph::types::Name;

pub const DOCUMENTS_TABLE: &str = "documents";
pub const EDGES_TABLE: &str = "edges";

/// Index positions of the contract tables
pub mod index {
    pub const PRIMARY: u8 = 1;
    /// `documents` by hash
    pub const BY_HASH: u8 = 2;
    /// `edges` by `from_node`
    pub const BY_FROM_NODE: u8 = 2;
    /// `edges` by `to_node`
    pub const BY_TO_NODE: u8 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    I64,
    Sha256,
}

/// Paginated table read, in the chain's `get_table_rows` shape
///
/// Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRequest {
    pub code: Name,
    pub scope: Name,
    pub table: Name,
    #[serde(serialize_with = "serialize_position")]
    pub index_position: u8,
    pub key_type: KeyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<String>,
    pub limit: u32,
    pub reverse: bool,
    pub json: bool,
}

fn serialize_position<S: Serializer>(position: &u8, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&position.to_string())
}

impl TableRequest {
    /// Primary-key read of `table` in the contract's own scope
    pub fn new(contract: &Name, table: &'static str) -> Self {
        TableRequest {
            code: contract.clone(),
            scope: contract.clone(),
            table: Name::from_static(table),
            index_position: index::PRIMARY,
            key_type: KeyType::I64,
            lower_bound: None,
            upper_bound: None,
            limit: 1,
            reverse: false,
            json: true,
        }
    }

    pub fn index(mut self, position: u8, key_type: KeyType) -> Self {
        self.index_position = position;
        self.key_type = key_type;
        self
    }

    pub fn lower_bound(mut self, bound: impl ToString) -> Self {
        self.lower_bound = Some(bound.to_string());
        self
    }

    pub fn upper_bound(mut self, bound: impl ToString) -> Self {
        self.upper_bound = Some(bound.to_string());
        self
    }

    /// Restrict the scan to a single key
    pub fn key(self, key: impl ToString) -> Self {
        let key = key.to_string();
        self.lower_bound(&key).upper_bound(key)
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// One page of table rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRows {
    #[serde(default)]
    pub rows: Vec<JsonValue>,
    /// Whether rows remain past this page
    #[serde(default)]
    pub more: bool,
    #[serde(default)]
    pub next_key: String,
}

impl TableRows {
    /// Decode every row into its fixed schema
    pub fn decode<T: DeserializeOwned>(self) -> DocGraphResult<Vec<T>> {
        self.rows
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }
}

/// Unified interface to the ledger holding the graph
///
/// Implemented by:
/// - `HttpLedger`: the chain HTTP API over `reqwest`
/// - `MemoryLedger`: in-process tables, for tests and embedded use
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Read one page of a table
    async fn get_table_rows(&self, request: &TableRequest) -> DocGraphResult<TableRows>;

    /// Submit an action and wait until it commits or fails
    async fn push_action(&self, action: &Action) -> DocGraphResult<TransactionRef>;
}
