mod common;

use common::{ScriptedTransport, page};
use nexus_query::query::{Connection, Operation, QueryRequest, ScrollState};
use nexus_query::SearchConfig;
use serde_json::json;

fn scripted_25_items(transport: &ScriptedTransport) {
    transport
        .respond(page(0..10, "s1", 25))
        .respond(page(10..20, "s2", 25))
        .respond(page(20..25, "s3", 25));
}

#[test]
fn chunk_pages_of_ten_over_twenty_five_items() {
    let transport = ScriptedTransport::new();
    scripted_25_items(&transport);
    let conn = Connection::new(&transport, SearchConfig::default());

    let mut sizes = Vec::new();
    let mut previous_ids = Vec::new();
    let completed = conn
        .chunk(&QueryRequest::new("items"), 10, |docs, previous| {
            sizes.push(docs.len());
            previous_ids.push(previous.map(str::to_string));
            true
        })
        .unwrap();

    assert!(completed);
    assert_eq!(sizes, vec![10, 10, 5]);
    assert_eq!(previous_ids, vec![None, Some("s1".to_string()), Some("s2".to_string())]);
    // The short page ends the loop; no fourth request.
    assert_eq!(transport.request_count(), 3);
}

#[test]
fn chunk_stops_when_callback_declines() {
    let transport = ScriptedTransport::new();
    scripted_25_items(&transport);
    let conn = Connection::new(&transport, SearchConfig::default());

    let completed = conn.chunk(&QueryRequest::new("items"), 10, |_, _| false).unwrap();
    assert!(!completed);
    assert_eq!(transport.request_count(), 1);
}

#[test]
fn follow_up_requests_carry_only_scroll_id_and_keep_alive() {
    let transport = ScriptedTransport::new();
    scripted_25_items(&transport);
    let conn = Connection::new(&transport, SearchConfig::default());
    conn.chunk(&QueryRequest::new("items").where_eq("kind", "x"), 10, |_, _| true).unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].0, Operation::Search);
    assert_eq!(requests[0].1["scroll"], json!("10m"));
    assert_eq!(requests[0].1["body"]["sort"], json!([{"_doc": {"order": "asc"}}]));
    assert_eq!(requests[0].1["body"]["size"], json!(10));
    assert_eq!(requests[1].0, Operation::Scroll);
    assert_eq!(requests[1].1, json!({"scroll_id": "s1", "scroll": "10m"}));
    assert_eq!(requests[2].1, json!({"scroll_id": "s2", "scroll": "10m"}));
}

#[test]
fn scroll_cursor_walks_until_an_empty_page() {
    let transport = ScriptedTransport::new();
    transport
        .respond(page(0..2, "s1", 3))
        .respond(page(2..3, "s2", 3))
        .respond(page(0..0, "s3", 3));
    let conn = Connection::new(&transport, SearchConfig::default());
    let mut cursor = conn.scroll(&QueryRequest::new("items"));
    assert_eq!(cursor.state(), &ScrollState::Idle);

    let first = cursor.next_page().unwrap().unwrap();
    assert_eq!(first.documents.len(), 2);
    assert_eq!(first.total, 3);
    assert_eq!(cursor.scroll_id(), Some("s1"));

    assert_eq!(cursor.next_page().unwrap().unwrap().documents.len(), 1);
    assert!(cursor.next_page().unwrap().is_none());
    assert_eq!(cursor.state(), &ScrollState::Exhausted);
    assert!(cursor.next_page().unwrap().is_none());
    assert_eq!(transport.request_count(), 3);
}

#[test]
fn document_cursor_respects_limit() {
    let transport = ScriptedTransport::new();
    transport.respond(page(0..3, "s1", 10)).respond(page(3..6, "s2", 10));
    let config = SearchConfig { cursor_chunk_size: 3, ..SearchConfig::default() };
    let conn = Connection::new(&transport, config);

    let docs = conn.cursor(&QueryRequest::new("items").limit(4)).to_vec().unwrap();
    assert_eq!(docs.len(), 4);
    assert_eq!(docs[3]["id"], json!("3"));
    assert_eq!(transport.requests()[0].1["body"]["size"], json!(3));
}

#[test]
fn document_cursor_surfaces_transport_errors() {
    let transport = ScriptedTransport::new();
    transport.respond(page(0..2, "s1", 4)).fail("node went away");
    let conn = Connection::new(&transport, SearchConfig::default());

    let mut cursor = conn.cursor(&QueryRequest::new("items"));
    assert!(cursor.next().unwrap().is_ok());
    assert!(cursor.next().unwrap().is_ok());
    let err = cursor.next().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "node went away");
    assert!(cursor.next().is_none());
}
