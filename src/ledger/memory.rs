//! MemoryLedger: in-process ledger holding the contract tables
//!
//! Implements the `documents` and `edges` tables with their secondary
//! indices and the contract actions. No network, no signing: actions commit
//! as soon as they are pushed. Ideal for tests, demos and embedded use.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::action::{
    Action, CertifyDocument, CreateDocument, EraseDocument, NewEdge, RemoveEdge, TransactionRef, CERTIFY,
    CREATE, ERASE, GET_OR_NEW, NEW_EDGE, REMOVE_EDGE,
};
use super::client::{index, KeyType, LedgerClient, TableRequest, TableRows, DOCUMENTS_TABLE, EDGES_TABLE};
use crate::error::{DocGraphError, DocGraphResult};
use crate::graph::codec::Pack;
use crate::graph::content::ContentGroup;
use crate::graph::document::{Certificate, Document};
use crate::graph::edge::Edge;
use crate::graph::types::{Checksum256, Name, TimePoint};

/// Content hash the contract assigns: SHA-256 of the packed content groups
pub fn content_hash(content_groups: &[ContentGroup]) -> Checksum256 {
    let mut buf = Vec::new();
    for group in content_groups {
        group.pack(&mut buf);
    }
    Checksum256::digest(buf)
}

#[derive(Debug, Default)]
struct Tables {
    documents: BTreeMap<u64, Document>,
    by_hash: BTreeMap<Checksum256, u64>,
    edges: BTreeMap<u64, Edge>,
    next_document_id: u64,
    next_edge_id: u64,
}

/// In-process ledger for one contract account
pub struct MemoryLedger {
    contract: Name,
    tables: RwLock<Tables>,
    /// Rows returned per response, below the requested limit
    max_rows_per_response: Option<usize>,
    pending_faults: AtomicU32,
    transactions: AtomicU64,
}

impl MemoryLedger {
    pub fn new(contract: Name) -> Self {
        Self {
            contract,
            tables: RwLock::new(Tables::default()),
            max_rows_per_response: None,
            pending_faults: AtomicU32::new(0),
            transactions: AtomicU64::new(0),
        }
    }

    /// Cap rows per response while still reporting `more`, like a node
    /// cutting a page short on its time budget
    pub fn with_max_rows_per_response(mut self, max_rows: usize) -> Self {
        self.max_rows_per_response = Some(max_rows.max(1));
        self
    }

    /// Fail the next `count` calls with a transient transport error
    pub fn fail_next(&self, count: u32) {
        self.pending_faults.store(count, Ordering::SeqCst);
    }

    pub fn contract(&self) -> &Name {
        &self.contract
    }

    pub async fn document_count(&self) -> usize {
        self.tables.read().await.documents.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.tables.read().await.edges.len()
    }

    /// Insert an edge row directly, bypassing the endpoint checks of `newedge`
    pub async fn insert_edge_row(&self, mut edge: Edge) -> u64 {
        let mut tables = self.tables.write().await;
        edge.id = tables.next_edge_id;
        tables.next_edge_id += 1;
        let id = edge.id;
        tables.edges.insert(id, edge);
        id
    }

    fn take_fault(&self) -> DocGraphResult<()> {
        let taken = self
            .pending_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match taken {
            Ok(remaining) => Err(DocGraphError::Transport(format!(
                "injected fault ({} more pending)",
                remaining.saturating_sub(1)
            ))),
            Err(_) => Ok(()),
        }
    }

    fn next_transaction(&self, return_value: Option<serde_json::Value>) -> TransactionRef {
        let sequence = self.transactions.fetch_add(1, Ordering::SeqCst);
        TransactionRef {
            transaction_id: Checksum256::digest(sequence.to_le_bytes()).to_string(),
            return_value,
        }
    }

    fn limit_for(&self, request: &TableRequest) -> usize {
        let requested = (request.limit as usize).max(1);
        match self.max_rows_per_response {
            Some(cap) => requested.min(cap),
            None => requested,
        }
    }
}

fn rejected(action: &str, message: impl Into<String>) -> DocGraphError {
    DocGraphError::Rejected {
        action: action.to_string(),
        message: message.into(),
    }
}

fn parse_bound<K: FromStr>(bound: &Option<String>) -> DocGraphResult<Option<K>>
where
    K::Err: Display,
{
    bound
        .as_deref()
        .map(|text| {
            text.parse()
                .map_err(|e| rejected("get_table_rows", format!("invalid bound {:?}: {}", text, e)))
        })
        .transpose()
}

/// Range-scan `(key, primary id)` entries the way a chain index does
fn select<K, T, F>(
    mut entries: Vec<(K, u64)>,
    request: &TableRequest,
    limit: usize,
    row: F,
) -> DocGraphResult<TableRows>
where
    K: Ord + Copy + FromStr + Display,
    K::Err: Display,
    T: Serialize,
    F: Fn(u64) -> Option<T>,
{
    let lower: Option<K> = parse_bound(&request.lower_bound)?;
    let upper: Option<K> = parse_bound(&request.upper_bound)?;
    entries.retain(|(key, _)| lower.map_or(true, |l| *key >= l) && upper.map_or(true, |u| *key <= u));
    entries.sort_unstable();
    if request.reverse {
        entries.reverse();
    }

    let mut rows = Vec::with_capacity(limit.min(entries.len()));
    for (_, id) in entries.iter().take(limit) {
        if let Some(value) = row(*id) {
            rows.push(serde_json::to_value(value)?);
        }
    }
    let next_key = entries.get(limit).map(|(key, _)| key.to_string()).unwrap_or_default();
    Ok(TableRows {
        rows,
        more: entries.len() > limit,
        next_key,
    })
}

impl Tables {
    fn insert_document(&mut self, creator: Name, content_groups: Vec<ContentGroup>) -> Checksum256 {
        let hash = content_hash(&content_groups);
        let id = self.next_document_id;
        self.next_document_id += 1;
        self.documents.insert(
            id,
            Document {
                id,
                hash,
                creator,
                content_groups,
                certificates: Vec::new(),
                created_date: TimePoint::now(),
            },
        );
        self.by_hash.insert(hash, id);
        hash
    }

    fn document_mut(&mut self, hash: &Checksum256) -> Option<&mut Document> {
        let id = self.by_hash.get(hash)?;
        self.documents.get_mut(id)
    }

    fn read_documents(&self, request: &TableRequest, limit: usize) -> DocGraphResult<TableRows> {
        let row = |id: u64| self.documents.get(&id);
        match (request.index_position, request.key_type) {
            (index::PRIMARY, KeyType::I64) => {
                select(self.documents.keys().map(|id| (*id, *id)).collect(), request, limit, row)
            }
            (index::BY_HASH, KeyType::Sha256) => {
                select(self.by_hash.iter().map(|(h, id)| (*h, *id)).collect(), request, limit, row)
            }
            (position, key_type) => Err(rejected(
                "get_table_rows",
                format!("documents has no index {} of type {:?}", position, key_type),
            )),
        }
    }

    fn read_edges(&self, request: &TableRequest, limit: usize) -> DocGraphResult<TableRows> {
        let row = |id: u64| self.edges.get(&id);
        match (request.index_position, request.key_type) {
            (index::PRIMARY, KeyType::I64) => {
                select(self.edges.keys().map(|id| (*id, *id)).collect(), request, limit, row)
            }
            (index::BY_FROM_NODE, KeyType::Sha256) => select(
                self.edges.values().map(|e| (e.from_node, e.id)).collect(),
                request,
                limit,
                row,
            ),
            (index::BY_TO_NODE, KeyType::Sha256) => select(
                self.edges.values().map(|e| (e.to_node, e.id)).collect(),
                request,
                limit,
                row,
            ),
            (position, key_type) => Err(rejected(
                "get_table_rows",
                format!("edges has no index {} of type {:?}", position, key_type),
            )),
        }
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn get_table_rows(&self, request: &TableRequest) -> DocGraphResult<TableRows> {
        self.take_fault()?;
        if request.code != self.contract || request.scope != self.contract {
            return Err(rejected(
                "get_table_rows",
                format!("no tables for {} in scope {}", request.code, request.scope),
            ));
        }

        let limit = self.limit_for(request);
        let tables = self.tables.read().await;
        match request.table.as_str() {
            DOCUMENTS_TABLE => tables.read_documents(request, limit),
            EDGES_TABLE => tables.read_edges(request, limit),
            other => Err(rejected("get_table_rows", format!("unknown table {}", other))),
        }
    }

    async fn push_action(&self, action: &Action) -> DocGraphResult<TransactionRef> {
        self.take_fault()?;
        let name = action.name.as_str();
        if action.account != self.contract {
            return Err(rejected(name, format!("{} is not deployed on {}", name, action.account)));
        }
        if action.authorization.is_empty() {
            return Err(rejected(name, "missing authorization"));
        }
        debug!("MemoryLedger applying {}", name);

        let mut tables = self.tables.write().await;
        match name {
            CREATE => {
                let payload: CreateDocument = action.data.decode()?;
                let hash = content_hash(&payload.content_groups);
                if tables.by_hash.contains_key(&hash) {
                    return Err(rejected(name, format!("document already exists: {}", hash)));
                }
                tables.insert_document(payload.creator, payload.content_groups);
                Ok(self.next_transaction(None))
            }
            GET_OR_NEW => {
                let payload: CreateDocument = action.data.decode()?;
                let hash = content_hash(&payload.content_groups);
                if !tables.by_hash.contains_key(&hash) {
                    tables.insert_document(payload.creator, payload.content_groups);
                }
                Ok(self.next_transaction(Some(serde_json::json!({ "hash": hash }))))
            }
            NEW_EDGE => {
                let payload: NewEdge = action.data.decode_json()?;
                for endpoint in [&payload.from_node, &payload.to_node] {
                    if !tables.by_hash.contains_key(endpoint) {
                        return Err(rejected(name, format!("document not found: {}", endpoint)));
                    }
                }
                let id = tables.next_edge_id;
                tables.next_edge_id += 1;
                tables.edges.insert(
                    id,
                    Edge {
                        id,
                        creator: payload.creator,
                        from_node: payload.from_node,
                        to_node: payload.to_node,
                        edge_name: payload.edge_name,
                        created_date: TimePoint::now(),
                    },
                );
                Ok(self.next_transaction(None))
            }
            ERASE => {
                let payload: EraseDocument = action.data.decode_json()?;
                let id = tables
                    .by_hash
                    .remove(&payload.hash)
                    .ok_or_else(|| rejected(name, format!("document not found: {}", payload.hash)))?;
                tables.documents.remove(&id);
                // edges of an erased document go with it
                tables
                    .edges
                    .retain(|_, e| e.from_node != payload.hash && e.to_node != payload.hash);
                Ok(self.next_transaction(None))
            }
            REMOVE_EDGE => {
                let payload: RemoveEdge = action.data.decode_json()?;
                let before = tables.edges.len();
                tables
                    .edges
                    .retain(|_, e| !e.matches(&payload.from_node, &payload.to_node, &payload.edge_name));
                if tables.edges.len() == before {
                    return Err(rejected(
                        name,
                        format!(
                            "edge not found: {} --{}--> {}",
                            payload.from_node, payload.edge_name, payload.to_node
                        ),
                    ));
                }
                Ok(self.next_transaction(None))
            }
            CERTIFY => {
                let payload: CertifyDocument = action.data.decode_json()?;
                let document = tables
                    .document_mut(&payload.hash)
                    .ok_or_else(|| rejected(name, format!("document not found: {}", payload.hash)))?;
                document.certificates.push(Certificate {
                    certifier: payload.certifier,
                    notes: payload.notes,
                    certification_date: TimePoint::now(),
                });
                Ok(self.next_transaction(None))
            }
            other => Err(rejected(other, "unknown action")),
        }
    }
}
