//! Tests for clients editing one document through the authority service
//!
//! This tests:
//! - Several clients editing concurrently end on the authority's document
//! - Broadcast updates applied out of band are idempotent
//! - Structural edits rebase over concurrent text edits

use folio_collab::{Authority, AuthorityConfig, AuthorityService, ClientHandle, Response};
use folio_model::Node;
use folio_schema_basic::{doc, p, schema};
use folio_transform::{commands, Transform};

fn insert(doc: &Node, text: &str, pos: usize) -> Option<Transform> {
    let mut tr = Transform::new(doc.clone());
    tr.insert_text(text, pos, None).ok()?;
    Some(tr)
}

async fn start(doc: Node) -> (AuthorityService, Vec<ClientHandle>) {
    let (service, _task) = AuthorityService::spawn(Authority::new(doc, AuthorityConfig::default()));
    let mut clients = Vec::new();
    for id in ["a", "b", "c"] {
        clients.push(ClientHandle::connect(service.clone(), id).await.unwrap());
    }
    (service, clients)
}

async fn settle(service: &AuthorityService, clients: &[ClientHandle]) -> Node {
    for client in clients {
        client.flush().await.unwrap();
    }
    for client in clients {
        client.sync().await.unwrap();
    }
    let (doc, _) = service.snapshot().await.unwrap();
    doc
}

#[tokio::test]
async fn test_three_clients_converge() {
    let (service, clients) = start(doc![p!["one"], p!["two"]].doc).await;

    clients[0].edit(|d| insert(d, "A", 1)).await.unwrap();
    clients[1].edit(|d| insert(d, "B", 4)).await.unwrap();
    clients[2].edit(|d| insert(d, "C", 9)).await.unwrap();
    clients[2].edit(|d| insert(d, "D", 10)).await.unwrap();

    let final_doc = settle(&service, &clients).await;
    assert_eq!(final_doc.to_string(), r#"doc(paragraph("AoneB"), paragraph("twoCD"))"#);
    for client in &clients {
        assert_eq!(client.doc().await, final_doc);
        assert_eq!(client.version().await, 4);
    }
}

#[tokio::test]
async fn test_repeated_rounds_converge() {
    let (service, clients) = start(doc![p!["x"]].doc).await;

    for round in 0..5 {
        for (i, client) in clients.iter().enumerate() {
            let text = format!("{}{}", i, round);
            client.edit(|d| insert(d, &text, 1)).await.unwrap();
        }
        let final_doc = settle(&service, &clients).await;
        for client in &clients {
            assert_eq!(client.doc().await, final_doc);
        }
    }
    let (doc, version) = service.snapshot().await.unwrap();
    assert_eq!(version, 15);
    assert_eq!(doc.text_content().len(), 31);
}

#[tokio::test]
async fn test_broadcasts_are_idempotent() {
    let (service, clients) = start(doc![p!["hello"]].doc).await;
    let mut updates = service.subscribe();

    clients[0].edit(|d| insert(d, "!", 6)).await.unwrap();
    clients[0].flush().await.unwrap();
    let update = updates.recv().await.unwrap();
    assert!(matches!(update, Response::Steps { version: 0, .. }));

    clients[1].receive(update.clone()).await.unwrap();
    clients[1].receive(update).await.unwrap();
    clients[1].sync().await.unwrap();
    assert_eq!(clients[1].doc().await.to_string(), r#"doc(paragraph("hello!"))"#);
    assert_eq!(clients[1].version().await, 1);
}

#[tokio::test]
async fn test_split_rebases_over_text_edit() {
    let (service, clients) = start(doc![p!["hello world"]].doc).await;
    let strong = schema().mark_type("strong").unwrap();

    clients[0].edit(|d| commands::split_block(d, 6, 6)).await.unwrap();
    clients[1].edit(|d| insert(d, "!", 12)).await.unwrap();
    clients[2]
        .edit(|d| commands::toggle_mark(d, 1, 6, &strong, None))
        .await
        .unwrap();

    let final_doc = settle(&service, &clients).await;
    assert_eq!(
        final_doc.to_string(),
        r#"doc(paragraph(strong("hello")), paragraph(" world!"))"#
    );
    for client in &clients {
        assert_eq!(client.doc().await, final_doc);
    }
}
