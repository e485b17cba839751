use nexus_query::query::{document_from_hit, process};
use serde_json::json;

#[test]
fn zero_hits_is_empty_not_an_error() {
    let results = process(&json!({"took": 1, "hits": {"total": {"value": 0}, "hits": []}}), false);
    assert!(results.is_empty());
    assert_eq!(results.total, 0);

    let bare = process(&json!({}), true);
    assert!(bare.is_empty());
    assert_eq!(bare.total, 0);
    assert_eq!(bare.scroll_id, None);
}

#[test]
fn legacy_integer_total_and_missing_source() {
    let results = process(&json!({"hits": {"total": 7, "hits": [{"_id": "x"}]}}), false);
    assert_eq!(results.total, 7);
    assert_eq!(results.len(), 1);
    assert_eq!(serde_json::Value::Object(results.documents[0].clone()), json!({"id": "x"}));
    assert_eq!(results.took, None);
}

#[test]
fn inner_hits_without_entries_are_not_attached() {
    let hit = json!({"_id": "q1", "_source": {}, "inner_hits": {"answer": {"hits": {"hits": []}}}});
    assert!(!document_from_hit(&hit, true).contains_key("inner_hits"));
}
