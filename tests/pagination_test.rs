use async_trait::async_trait;
use docgraph::ledger::{Action, TableRequest, TableRows, TransactionRef};
use docgraph::{
    Checksum256, ContentGroup, DocGraph, DocGraphError, DocGraphResult, LedgerClient, LedgerConfig, MemoryLedger,
    Name,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

fn contract() -> Name {
    Name::new("docs").unwrap()
}

fn config(page_size: u32) -> LedgerConfig {
    let mut config = LedgerConfig::new("http://127.0.0.1:8888", contract());
    config.page_size = page_size;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 2;
    config
}

async fn seed(docgraph: &DocGraph<MemoryLedger>, count: usize) -> Vec<Checksum256> {
    let creator = Name::new("alice").unwrap();
    let cancel = CancellationToken::new();
    let mut hashes = Vec::with_capacity(count);
    for i in 0..count {
        let content = vec![ContentGroup::labeled("details").with("seq", i as i64)];
        let doc = docgraph.create_document(&creator, content, &cancel).await.unwrap();
        hashes.push(doc.hash);
    }
    hashes
}

#[tokio::test]
async fn test_fetch_all_documents_page_boundaries() {
    let page = 5u32;
    for count in [0usize, 1, 4, 5, 6, 17] {
        let docgraph = DocGraph::new(MemoryLedger::new(contract()), &config(page));
        let created = seed(&docgraph, count).await;

        let fetched = docgraph.fetch_all_documents(&CancellationToken::new()).await.unwrap();
        assert_eq!(fetched.len(), count, "wrong count for N = {}", count);

        // no duplicates, no gaps
        let unique: HashSet<Checksum256> = fetched.iter().map(|d| d.hash).collect();
        assert_eq!(unique.len(), count);
        assert_eq!(unique, created.iter().copied().collect::<HashSet<_>>());
        let ids: Vec<u64> = fetched.iter().map(|d| d.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids out of order: {:?}", ids);
    }
}

#[tokio::test]
async fn test_fetch_all_edges_page_boundaries() {
    let docgraph = DocGraph::new(MemoryLedger::new(contract()), &config(3));
    let hashes = seed(&docgraph, 4).await;
    let creator = Name::new("alice").unwrap();
    let cancel = CancellationToken::new();

    for i in 0..7 {
        let name = Name::new(format!("edge{}", i % 5 + 1)).unwrap();
        docgraph
            .create_edge(&creator, &hashes[i % 4], &hashes[(i + 1) % 4], &name, &cancel)
            .await
            .unwrap();
    }
    let edges = docgraph.fetch_all_edges(&cancel).await.unwrap();
    assert_eq!(edges.len(), 7);
    let ids: HashSet<u64> = edges.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), 7);
}

#[tokio::test]
async fn test_short_pages_that_report_more() {
    // the ledger returns 2 rows per response even though 10 are requested
    let ledger = MemoryLedger::new(contract()).with_max_rows_per_response(2);
    let docgraph = DocGraph::new(ledger, &config(10));
    seed(&docgraph, 9).await;

    let fetched = docgraph.fetch_all_documents(&CancellationToken::new()).await.unwrap();
    assert_eq!(fetched.len(), 9);
}

#[tokio::test]
async fn test_thousand_documents() {
    let docgraph = DocGraph::new(MemoryLedger::new(contract()), &config(100));
    seed(&docgraph, 1000).await;

    let fetched = docgraph.fetch_all_documents(&CancellationToken::new()).await.unwrap();
    assert_eq!(fetched.len(), 1000);
    assert_eq!(docgraph.ledger().document_count().await, 1000);
}

/// Claims more rows exist but never returns any
struct StalledLedger;

#[async_trait]
impl LedgerClient for StalledLedger {
    async fn get_table_rows(&self, _request: &TableRequest) -> DocGraphResult<TableRows> {
        Ok(TableRows {
            rows: Vec::new(),
            more: true,
            next_key: String::new(),
        })
    }

    async fn push_action(&self, _action: &Action) -> DocGraphResult<TransactionRef> {
        Ok(TransactionRef::default())
    }
}

#[tokio::test]
async fn test_empty_page_with_more_does_not_loop() {
    let docgraph = DocGraph::new(StalledLedger, &config(10));
    let result = docgraph.fetch_all_documents(&CancellationToken::new()).await;
    assert!(matches!(result, Err(DocGraphError::PaginationStalled { cursor: 0, .. })));
}

/// Cancels the caller's token after a set number of reads once armed
struct CancellingLedger {
    inner: MemoryLedger,
    cancel: CancellationToken,
    /// Reads left before cancelling; zero means disarmed
    remaining: AtomicUsize,
}

impl CancellingLedger {
    fn arm(&self, reads: usize) {
        self.remaining.store(reads, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerClient for CancellingLedger {
    async fn get_table_rows(&self, request: &TableRequest) -> DocGraphResult<TableRows> {
        let rows = self.inner.get_table_rows(request).await?;
        let left = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if left == Ok(1) {
            self.cancel.cancel();
        }
        Ok(rows)
    }

    async fn push_action(&self, action: &Action) -> DocGraphResult<TransactionRef> {
        self.inner.push_action(action).await
    }
}

#[tokio::test]
async fn test_cancellation_between_pages_discards_partial_results() {
    let cancel = CancellationToken::new();
    let ledger = CancellingLedger {
        inner: MemoryLedger::new(contract()),
        cancel: cancel.clone(),
        remaining: AtomicUsize::new(0),
    };
    let docgraph = DocGraph::new(ledger, &config(2));
    let creator = Name::new("alice").unwrap();
    for i in 0..10i64 {
        let content = vec![ContentGroup::labeled("details").with("seq", i)];
        docgraph
            .create_document(&creator, content, &CancellationToken::new())
            .await
            .unwrap();
    }

    // two of five pages are served, then the caller gives up
    docgraph.ledger().arm(2);
    let result = docgraph.fetch_all_documents(&cancel).await;
    assert!(matches!(result, Err(DocGraphError::Cancelled)));
}
