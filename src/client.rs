//! DocGraph: document graph operations against one contract
//!
//! Every remote-facing operation takes a [`CancellationToken`]. Transient
//! failures are retried here and nowhere else; decode and not-found errors
//! propagate on first sight.
//!
//! Bulk reads are best-effort and non-transactional: a row written while a
//! multi-page fetch is in flight may or may not be included.

use serde::de::DeserializeOwned;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{DocGraphError, DocGraphResult};
use crate::graph::content::ContentGroup;
use crate::graph::document::Document;
use crate::graph::edge::Edge;
use crate::graph::store::{matches_type, Graph};
use crate::graph::types::{Checksum256, Name};
use crate::ledger::action::{
    ActionData, CertifyDocument, CreateDocument, EraseDocument, NewEdge, RemoveEdge, TransactionRef, CERTIFY,
    CREATE, ERASE, GET_OR_NEW, NEW_EDGE, REMOVE_EDGE,
};
use crate::ledger::client::{index, KeyType, LedgerClient, TableRequest, TableRows, DOCUMENTS_TABLE, EDGES_TABLE};
use crate::ledger::config::{LedgerConfig, RetryConfig};
use crate::ledger::{with_retry, Action};

/// Which endpoint of an edge a scan is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// Edges whose `from_node` is the document
    From,
    /// Edges whose `to_node` is the document
    To,
}

impl EdgeDirection {
    fn index_position(&self) -> u8 {
        match self {
            EdgeDirection::From => index::BY_FROM_NODE,
            EdgeDirection::To => index::BY_TO_NODE,
        }
    }

    fn keyed_on(&self, edge: &Edge, hash: &Checksum256) -> bool {
        match self {
            EdgeDirection::From => edge.starts_from(hash),
            EdgeDirection::To => edge.ends_at(hash),
        }
    }
}

impl fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeDirection::From => write!(f, "from"),
            EdgeDirection::To => write!(f, "to"),
        }
    }
}

/// Result of a direction-scoped edge scan
#[derive(Debug, Clone, Default)]
pub struct EdgeScan {
    pub edges: Vec<Edge>,
    /// The scan hit its row limit; more edges exist than were returned
    pub truncated: bool,
}

impl EdgeScan {
    /// Keep only edges named `edge_name`; truncation carries over
    pub fn named(mut self, edge_name: &Name) -> Self {
        self.edges.retain(|edge| edge.edge_name == *edge_name);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }
}

/// Client for the document graph of one contract
pub struct DocGraph<L> {
    ledger: L,
    contract: Name,
    permission: Name,
    page_size: u32,
    edge_scan_limit: u32,
    retry: RetryConfig,
    packed_payloads: bool,
}

impl<L: LedgerClient> DocGraph<L> {
    pub fn new(ledger: L, config: &LedgerConfig) -> Self {
        Self {
            ledger,
            contract: config.contract.clone(),
            permission: config.permission.clone(),
            page_size: config.page_size.max(1),
            edge_scan_limit: config.edge_scan_limit.max(1),
            retry: config.retry.clone(),
            packed_payloads: false,
        }
    }

    /// Submit document payloads as pre-encoded binary instead of JSON
    pub fn with_packed_payloads(mut self, packed: bool) -> Self {
        self.packed_payloads = packed;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn contract(&self) -> &Name {
        &self.contract
    }

    async fn read(&self, request: &TableRequest, cancel: &CancellationToken) -> DocGraphResult<TableRows> {
        with_retry(&self.retry, cancel, "get_table_rows", || self.ledger.get_table_rows(request)).await
    }

    /// Submit an action on the contract, retrying transient failures
    ///
    /// A submission whose outcome was lost to a timeout is submitted again,
    /// so a non-idempotent action can surface a conclusive refusal for work
    /// that did commit.
    pub async fn submit_action(
        &self,
        actor: &Name,
        action_name: &str,
        data: ActionData,
        cancel: &CancellationToken,
    ) -> DocGraphResult<TransactionRef> {
        let action = Action::new(
            self.contract.clone(),
            Name::new(action_name)?,
            actor.clone(),
            self.permission.clone(),
            data,
        );
        debug!("Submitting {}::{} as {}", self.contract, action_name, actor);
        let trx = with_retry(&self.retry, cancel, action_name, || self.ledger.push_action(&action)).await?;
        debug!("{} committed in {}", action_name, trx.transaction_id);
        Ok(trx)
    }

    /// Most recently inserted document
    ///
    /// Used after a create to learn the assigned hash. Another writer on the
    /// same contract can slip in between, so callers verify the content.
    pub async fn fetch_last_document(&self, cancel: &CancellationToken) -> DocGraphResult<Document> {
        let request = TableRequest::new(&self.contract, DOCUMENTS_TABLE).reverse().limit(1);
        self.read(&request, cancel)
            .await?
            .decode::<Document>()?
            .into_iter()
            .next()
            .ok_or(DocGraphError::DocumentNotFound(Checksum256::default()))
    }

    pub async fn fetch_document_by_hash(
        &self,
        hash: &Checksum256,
        cancel: &CancellationToken,
    ) -> DocGraphResult<Document> {
        let request = TableRequest::new(&self.contract, DOCUMENTS_TABLE)
            .index(index::BY_HASH, KeyType::Sha256)
            .key(hash)
            .limit(1);
        self.read(&request, cancel)
            .await?
            .decode::<Document>()?
            .into_iter()
            .find(|doc| doc.hash == *hash)
            .ok_or(DocGraphError::DocumentNotFound(*hash))
    }

    pub async fn fetch_all_documents(&self, cancel: &CancellationToken) -> DocGraphResult<Vec<Document>> {
        self.fetch_all(DOCUMENTS_TABLE, |doc: &Document| doc.id, cancel).await
    }

    pub async fn fetch_all_edges(&self, cancel: &CancellationToken) -> DocGraphResult<Vec<Edge>> {
        self.fetch_all(EDGES_TABLE, |edge: &Edge| edge.id, cancel).await
    }

    /// Cursor pagination over the primary key
    ///
    /// The next page starts one past the last id seen, so the boundary row is
    /// never read twice. A page that is empty or does not advance while the
    /// ledger still reports more rows fails instead of looping.
    async fn fetch_all<T>(
        &self,
        table: &'static str,
        row_id: fn(&T) -> u64,
        cancel: &CancellationToken,
    ) -> DocGraphResult<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let mut results: Vec<T> = Vec::new();
        let mut cursor: u64 = 0;
        let mut page = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Err(DocGraphError::Cancelled);
            }
            let request = TableRequest::new(&self.contract, table)
                .lower_bound(cursor)
                .limit(self.page_size);
            let batch = self.read(&request, cancel).await?;
            let more = batch.more;
            let rows: Vec<T> = batch.decode()?;
            page += 1;
            debug!(
                "{} page {}: {} rows from cursor {}, more = {}",
                table,
                page,
                rows.len(),
                cursor,
                more
            );

            let last_id = rows.last().map(row_id);
            results.extend(rows);
            if !more {
                break;
            }
            let stalled = move || DocGraphError::PaginationStalled {
                table: table.to_string(),
                cursor,
            };
            match last_id {
                Some(last) if last >= cursor => cursor = last.checked_add(1).ok_or_else(stalled)?,
                _ => return Err(stalled()),
            }
        }
        Ok(results)
    }

    /// Edges with `hash` at the given end, up to the scan limit
    pub async fn fetch_edges_by_node(
        &self,
        hash: &Checksum256,
        direction: EdgeDirection,
        cancel: &CancellationToken,
    ) -> DocGraphResult<EdgeScan> {
        let request = TableRequest::new(&self.contract, EDGES_TABLE)
            .index(direction.index_position(), KeyType::Sha256)
            .key(hash)
            .limit(self.edge_scan_limit);
        let page = self.read(&request, cancel).await?;
        let truncated = page.more;
        let edges: Vec<Edge> = page
            .decode::<Edge>()?
            .into_iter()
            .filter(|edge| direction.keyed_on(edge, hash))
            .collect();
        if truncated {
            warn!(
                "Edge scan {} {} stopped at {} rows; results are truncated",
                direction,
                hash,
                edges.len()
            );
        }
        Ok(EdgeScan { edges, truncated })
    }

    pub async fn get_edges_from(&self, hash: &Checksum256, cancel: &CancellationToken) -> DocGraphResult<EdgeScan> {
        self.fetch_edges_by_node(hash, EdgeDirection::From, cancel).await
    }

    pub async fn get_edges_to(&self, hash: &Checksum256, cancel: &CancellationToken) -> DocGraphResult<EdgeScan> {
        self.fetch_edges_by_node(hash, EdgeDirection::To, cancel).await
    }

    /// Outbound edges of `hash` named `edge_name`; the index is not
    /// partitioned by name, so the filter runs here
    ///
    /// A truncated scan stays flagged after filtering: an empty result may
    /// still hide matching edges past the scan limit.
    pub async fn get_edges_from_by_name(
        &self,
        hash: &Checksum256,
        edge_name: &Name,
        cancel: &CancellationToken,
    ) -> DocGraphResult<EdgeScan> {
        Ok(self.get_edges_from(hash, cancel).await?.named(edge_name))
    }

    pub async fn get_edges_to_by_name(
        &self,
        hash: &Checksum256,
        edge_name: &Name,
        cancel: &CancellationToken,
    ) -> DocGraphResult<EdgeScan> {
        Ok(self.get_edges_to(hash, cancel).await?.named(edge_name))
    }

    /// Exact triple membership
    ///
    /// Scans the outbound index of `from`; when that scan was truncated, the
    /// answer comes from the full edge table instead.
    pub async fn edge_exists(
        &self,
        from: &Checksum256,
        to: &Checksum256,
        edge_name: &Name,
        cancel: &CancellationToken,
    ) -> DocGraphResult<bool> {
        let scan = self.fetch_edges_by_node(from, EdgeDirection::From, cancel).await?;
        if scan.edges.iter().any(|edge| edge.matches(from, to, edge_name)) {
            return Ok(true);
        }
        if !scan.truncated {
            return Ok(false);
        }
        let edges = self.fetch_all_edges(cancel).await?;
        Ok(edges.iter().any(|edge| edge.matches(from, to, edge_name)))
    }

    /// Target document of the newest edge named `edge_name`
    ///
    /// Walks the edge table newest-first, one page at a time.
    pub async fn get_last_document_of_edge(
        &self,
        edge_name: &Name,
        cancel: &CancellationToken,
    ) -> DocGraphResult<Document> {
        let mut upper: Option<u64> = None;
        loop {
            if cancel.is_cancelled() {
                return Err(DocGraphError::Cancelled);
            }
            let mut request = TableRequest::new(&self.contract, EDGES_TABLE)
                .reverse()
                .limit(self.page_size);
            if let Some(upper) = upper {
                request = request.upper_bound(upper);
            }
            let page = self.read(&request, cancel).await?;
            let more = page.more;
            let edges: Vec<Edge> = page.decode()?;

            if let Some(edge) = edges.iter().find(|edge| edge.edge_name == *edge_name) {
                debug!("Last {} edge is {} -> {}", edge_name, edge.from_node, edge.to_node);
                return self.fetch_document_by_hash(&edge.to_node, cancel).await;
            }
            if !more {
                break;
            }
            let stalled = move || DocGraphError::PaginationStalled {
                table: EDGES_TABLE.to_string(),
                cursor: upper.unwrap_or(u64::MAX),
            };
            match edges.last() {
                Some(last) if upper.map_or(true, |u| last.id <= u) => match last.id.checked_sub(1) {
                    Some(next) => upper = Some(next),
                    None => break,
                },
                _ => return Err(stalled()),
            }
        }
        Err(DocGraphError::NoDocumentWithEdge(edge_name.clone()))
    }

    /// Documents whose `type` item equals `doc_type`; untyped documents are skipped
    pub async fn get_all_documents_for_type(
        &self,
        doc_type: &Name,
        cancel: &CancellationToken,
    ) -> DocGraphResult<Vec<Document>> {
        let mut documents = self.fetch_all_documents(cancel).await?;
        documents.retain(|doc| matches_type(doc, doc_type));
        Ok(documents)
    }

    fn document_payload(&self, payload: &CreateDocument) -> DocGraphResult<ActionData> {
        if self.packed_payloads {
            Ok(ActionData::packed(payload))
        } else {
            ActionData::json(payload)
        }
    }

    /// Locate the document an action just wrote and check its content
    async fn resolve_written(
        &self,
        trx: &TransactionRef,
        content_groups: Vec<ContentGroup>,
        cancel: &CancellationToken,
    ) -> DocGraphResult<Document> {
        let document = match trx.returned_hash() {
            Some(hash) => self.fetch_document_by_hash(&hash, cancel).await?,
            None => self.fetch_last_document(cancel).await?,
        };
        if !document.is_equal(&Document::new(content_groups)) {
            warn!("Document {} does not hold the submitted content", document.hash);
            return Err(DocGraphError::ContentMismatch(document.hash));
        }
        Ok(document)
    }

    /// Create a document and return it as stored, hash included
    pub async fn create_document(
        &self,
        creator: &Name,
        content_groups: Vec<ContentGroup>,
        cancel: &CancellationToken,
    ) -> DocGraphResult<Document> {
        let payload = CreateDocument {
            creator: creator.clone(),
            content_groups,
        };
        let trx = self
            .submit_action(creator, CREATE, self.document_payload(&payload)?, cancel)
            .await?;
        let document = self.resolve_written(&trx, payload.content_groups, cancel).await?;
        info!("Created document {} ({})", document.hash, document.node_label());
        Ok(document)
    }

    /// Find the document with the template's content, or create it
    ///
    /// Deduplication is the ledger's: it decides which stored document the
    /// template matches.
    pub async fn get_or_create_document(
        &self,
        creator: &Name,
        template: &Document,
        cancel: &CancellationToken,
    ) -> DocGraphResult<Document> {
        let payload = CreateDocument {
            creator: creator.clone(),
            content_groups: template.content_groups.clone(),
        };
        let trx = self
            .submit_action(creator, GET_OR_NEW, self.document_payload(&payload)?, cancel)
            .await?;
        let document = self.resolve_written(&trx, payload.content_groups, cancel).await?;
        debug!("get-or-create resolved to {}", document.hash);
        Ok(document)
    }

    pub async fn create_edge(
        &self,
        creator: &Name,
        from: &Checksum256,
        to: &Checksum256,
        edge_name: &Name,
        cancel: &CancellationToken,
    ) -> DocGraphResult<TransactionRef> {
        let payload = NewEdge {
            creator: creator.clone(),
            from_node: *from,
            to_node: *to,
            edge_name: edge_name.clone(),
        };
        let trx = self
            .submit_action(creator, NEW_EDGE, ActionData::json(&payload)?, cancel)
            .await?;
        info!("Created edge {} --{}--> {}", from, edge_name, to);
        Ok(trx)
    }

    /// Erase a document along with its edges
    ///
    /// Erasing a document that does not exist is an error; a verification
    /// read that no longer finds it is the expected outcome.
    pub async fn erase_document(&self, hash: &Checksum256, cancel: &CancellationToken) -> DocGraphResult<TransactionRef> {
        let data = ActionData::json(&EraseDocument { hash: *hash })?;
        let trx = self
            .submit_action(&self.contract, ERASE, data, cancel)
            .await
            .map_err(|e| not_found_as(e, || DocGraphError::DocumentNotFound(*hash)))?;

        match self.fetch_document_by_hash(hash, cancel).await {
            Err(DocGraphError::DocumentNotFound(_)) => {
                info!("Erased document {}", hash);
                Ok(trx)
            }
            Ok(_) => Err(DocGraphError::Rejected {
                action: ERASE.to_string(),
                message: format!("document {} is still present", hash),
            }),
            Err(e) => Err(e),
        }
    }

    pub async fn remove_edge(
        &self,
        from: &Checksum256,
        to: &Checksum256,
        edge_name: &Name,
        cancel: &CancellationToken,
    ) -> DocGraphResult<TransactionRef> {
        let data = ActionData::json(&RemoveEdge {
            from_node: *from,
            to_node: *to,
            edge_name: edge_name.clone(),
        })?;
        let trx = self
            .submit_action(&self.contract, REMOVE_EDGE, data, cancel)
            .await
            .map_err(|e| {
                not_found_as(e, || DocGraphError::EdgeNotFound {
                    from: *from,
                    to: *to,
                    edge_name: edge_name.clone(),
                })
            })?;

        if self.edge_exists(from, to, edge_name, cancel).await? {
            return Err(DocGraphError::Rejected {
                action: REMOVE_EDGE.to_string(),
                message: format!("edge {} --{}--> {} is still present", from, edge_name, to),
            });
        }
        info!("Removed edge {} --{}--> {}", from, edge_name, to);
        Ok(trx)
    }

    pub async fn certify_document(
        &self,
        certifier: &Name,
        hash: &Checksum256,
        notes: impl Into<String>,
        cancel: &CancellationToken,
    ) -> DocGraphResult<TransactionRef> {
        let data = ActionData::json(&CertifyDocument {
            certifier: certifier.clone(),
            hash: *hash,
            notes: notes.into(),
        })?;
        let trx = self
            .submit_action(certifier, CERTIFY, data, cancel)
            .await
            .map_err(|e| not_found_as(e, || DocGraphError::DocumentNotFound(*hash)))?;
        info!("{} certified {}", certifier, hash);
        Ok(trx)
    }

    /// Fetch every document and edge and assemble a [`Graph`]
    pub async fn load_graph(&self, cancel: &CancellationToken) -> DocGraphResult<Graph> {
        let documents = self.fetch_all_documents(cancel).await?;
        let edges = self.fetch_all_edges(cancel).await?;
        info!("Loading graph: {} documents, {} edges", documents.len(), edges.len());
        let graph = Graph::from_parts(documents, edges);
        if !graph.dangling_edges().is_empty() {
            warn!("{} edges reference documents outside the graph", graph.dangling_edges().len());
        }
        Ok(graph)
    }
}

/// A refusal whose message says the target does not exist
fn not_found_as(error: DocGraphError, not_found: impl FnOnce() -> DocGraphError) -> DocGraphError {
    match &error {
        DocGraphError::Rejected { message, .. } if message.contains("not found") => not_found(),
        _ => error,
    }
}
