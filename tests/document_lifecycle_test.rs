use docgraph::{ContentGroup, DocGraph, DocGraphError, Document, LedgerConfig, MemoryLedger, Name};
use tokio_util::sync::CancellationToken;

fn name(text: &str) -> Name {
    Name::new(text).unwrap()
}

fn setup() -> DocGraph<MemoryLedger> {
    let contract = name("docs");
    let config = LedgerConfig::new("http://127.0.0.1:8888", contract.clone());
    DocGraph::new(MemoryLedger::new(contract), &config)
}

fn member(account: &str) -> Vec<ContentGroup> {
    vec![
        ContentGroup::labeled("details").with("member", name(account)),
        ContentGroup::labeled("system").with("type", name("member")),
    ]
}

#[tokio::test]
async fn test_create_document_returns_stored_hash() {
    let docgraph = setup();
    let cancel = CancellationToken::new();
    let created = docgraph
        .create_document(&name("alice"), member("alice"), &cancel)
        .await
        .unwrap();
    assert!(!created.hash.is_zero());
    assert_eq!(created.creator, name("alice"));
    assert_eq!(created.get_type().unwrap(), name("member"));

    let fetched = docgraph.fetch_document_by_hash(&created.hash, &cancel).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert!(fetched.is_equal(&Document::new(member("alice"))));
}

#[tokio::test]
async fn test_duplicate_create_is_rejected() {
    let docgraph = setup();
    let cancel = CancellationToken::new();
    docgraph
        .create_document(&name("alice"), member("alice"), &cancel)
        .await
        .unwrap();
    let again = docgraph.create_document(&name("bob"), member("alice"), &cancel).await;
    assert!(matches!(again, Err(DocGraphError::Rejected { .. })));
    assert_eq!(docgraph.ledger().document_count().await, 1);
}

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let docgraph = setup();
    let cancel = CancellationToken::new();
    let template = Document::new(member("carol"));

    let first = docgraph
        .get_or_create_document(&name("carol"), &template, &cancel)
        .await
        .unwrap();
    let second = docgraph
        .get_or_create_document(&name("carol"), &template, &cancel)
        .await
        .unwrap();
    assert_eq!(first.hash, second.hash);
    assert_eq!(first.id, second.id);
    assert_eq!(docgraph.ledger().document_count().await, 1);

    // an existing document created through `create` is found, not duplicated
    let dave = docgraph
        .create_document(&name("dave"), member("dave"), &cancel)
        .await
        .unwrap();
    let found = docgraph
        .get_or_create_document(&name("dave"), &Document::new(member("dave")), &cancel)
        .await
        .unwrap();
    assert_eq!(found.hash, dave.hash);
    assert_eq!(docgraph.ledger().document_count().await, 2);
}

#[tokio::test]
async fn test_packed_payloads_store_the_same_document() {
    let docgraph = setup().with_packed_payloads(true);
    let cancel = CancellationToken::new();
    let template = Document::new(member("erin"));

    let packed = docgraph
        .get_or_create_document(&name("erin"), &template, &cancel)
        .await
        .unwrap();
    assert!(packed.is_equal(&template));
    assert_eq!(packed.get_type().unwrap(), name("member"));

    let json = setup();
    let plain = json
        .get_or_create_document(&name("erin"), &template, &cancel)
        .await
        .unwrap();
    assert_eq!(packed.hash, plain.hash);
}

#[tokio::test]
async fn test_erase_document_takes_its_edges() {
    let docgraph = setup();
    let cancel = CancellationToken::new();
    let alice = name("alice");
    let a = docgraph.create_document(&alice, member("alice"), &cancel).await.unwrap();
    let b = docgraph.create_document(&alice, member("bob"), &cancel).await.unwrap();
    let c = docgraph.create_document(&alice, member("carol"), &cancel).await.unwrap();
    docgraph.create_edge(&alice, &a.hash, &b.hash, &name("knows"), &cancel).await.unwrap();
    docgraph.create_edge(&alice, &c.hash, &a.hash, &name("knows"), &cancel).await.unwrap();
    docgraph.create_edge(&alice, &b.hash, &c.hash, &name("knows"), &cancel).await.unwrap();

    docgraph.erase_document(&a.hash, &cancel).await.unwrap();

    let missing = docgraph.fetch_document_by_hash(&a.hash, &cancel).await;
    assert!(matches!(missing, Err(DocGraphError::DocumentNotFound(h)) if h == a.hash));
    let edges = docgraph.fetch_all_edges(&cancel).await.unwrap();
    assert_eq!(edges.len(), 1);
    assert!(edges[0].matches(&b.hash, &c.hash, &name("knows")));

    let graph = docgraph.load_graph(&cancel).await.unwrap();
    assert_eq!(graph.node_count(), 2);
    assert!(graph.dangling_edges().is_empty());
}

#[tokio::test]
async fn test_erase_missing_document() {
    let docgraph = setup();
    let cancel = CancellationToken::new();
    let doc = docgraph
        .create_document(&name("alice"), member("alice"), &cancel)
        .await
        .unwrap();
    docgraph.erase_document(&doc.hash, &cancel).await.unwrap();

    let again = docgraph.erase_document(&doc.hash, &cancel).await;
    assert!(matches!(again, Err(DocGraphError::DocumentNotFound(h)) if h == doc.hash));
    assert!(again.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_remove_edge() {
    let docgraph = setup();
    let cancel = CancellationToken::new();
    let alice = name("alice");
    let a = docgraph.create_document(&alice, member("alice"), &cancel).await.unwrap();
    let b = docgraph.create_document(&alice, member("bob"), &cancel).await.unwrap();
    docgraph.create_edge(&alice, &a.hash, &b.hash, &name("knows"), &cancel).await.unwrap();
    docgraph.create_edge(&alice, &a.hash, &b.hash, &name("trusts"), &cancel).await.unwrap();

    docgraph.remove_edge(&a.hash, &b.hash, &name("knows"), &cancel).await.unwrap();
    assert!(!docgraph.edge_exists(&a.hash, &b.hash, &name("knows"), &cancel).await.unwrap());
    assert!(docgraph.edge_exists(&a.hash, &b.hash, &name("trusts"), &cancel).await.unwrap());

    let again = docgraph.remove_edge(&a.hash, &b.hash, &name("knows"), &cancel).await;
    match again {
        Err(DocGraphError::EdgeNotFound { from, to, edge_name }) => {
            assert_eq!(from, a.hash);
            assert_eq!(to, b.hash);
            assert_eq!(edge_name, name("knows"));
        }
        other => panic!("expected EdgeNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_edge_to_unknown_document_is_rejected() {
    let docgraph = setup();
    let cancel = CancellationToken::new();
    let a = docgraph
        .create_document(&name("alice"), member("alice"), &cancel)
        .await
        .unwrap();
    let unknown = docgraph::Checksum256::digest(b"nowhere");
    let result = docgraph
        .create_edge(&name("alice"), &a.hash, &unknown, &name("knows"), &cancel)
        .await;
    assert!(matches!(result, Err(DocGraphError::Rejected { .. })));
    assert_eq!(docgraph.ledger().edge_count().await, 0);
}

#[tokio::test]
async fn test_certify_document() {
    let docgraph = setup();
    let cancel = CancellationToken::new();
    let doc = docgraph
        .create_document(&name("alice"), member("alice"), &cancel)
        .await
        .unwrap();
    assert!(doc.certificates.is_empty());

    docgraph
        .certify_document(&name("bob"), &doc.hash, "reviewed", &cancel)
        .await
        .unwrap();
    let certified = docgraph.fetch_document_by_hash(&doc.hash, &cancel).await.unwrap();
    assert_eq!(certified.certificates.len(), 1);
    assert_eq!(certified.certificates[0].certifier, name("bob"));
    assert_eq!(certified.certificates[0].notes, "reviewed");
    // certification leaves the identity alone
    assert_eq!(certified.hash, doc.hash);

    let missing = docgraph
        .certify_document(&name("bob"), &docgraph::Checksum256::digest(b"x"), "", &cancel)
        .await;
    assert!(matches!(missing, Err(DocGraphError::DocumentNotFound(_))));
}

#[tokio::test]
async fn test_last_document_of_empty_table() {
    let docgraph = setup();
    let result = docgraph.fetch_last_document(&CancellationToken::new()).await;
    assert!(matches!(result, Err(DocGraphError::DocumentNotFound(h)) if h.is_zero()));
}
