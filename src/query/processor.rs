//! Raw search responses to documents.
//!
//! Processing never fails: missing sections read as empty and a response with no hits
//! yields no documents and `total = 0`.

use serde_json::{Map, Value};

use crate::types::Document;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub documents: Vec<Document>,
    pub aggregations: Map<String, Value>,
    pub total: u64,
    pub scroll_id: Option<String>,
    pub took: Option<u64>,
}

impl SearchResults {
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn aggregation_result(&self) -> AggregationResult {
        AggregationResult::new(self.aggregations.clone(), self.total)
    }
}

/// Read-only view over a response's aggregations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResult {
    aggregations: Map<String, Value>,
    total: u64,
}

impl AggregationResult {
    #[must_use]
    pub fn new(aggregations: Map<String, Value>, total: u64) -> Self {
        Self { aggregations, total }
    }

    #[must_use]
    pub fn aggregations(&self) -> &Map<String, Value> {
        &self.aggregations
    }

    /// The named aggregation, or an empty map when the response has none under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Map<String, Value> {
        match self.aggregations.get(key) {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Map one raw response. Inner hits are attached only when `include_inner_hits` is set.
#[must_use]
pub fn process(response: &Value, include_inner_hits: bool) -> SearchResults {
    let hits = response.get("hits");
    let documents = hits
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .map(|list| list.iter().map(|hit| document_from_hit(hit, include_inner_hits)).collect())
        .unwrap_or_default();
    let aggregations = match response.get("aggregations") {
        Some(Value::Object(m)) => m.clone(),
        _ => Map::new(),
    };
    SearchResults {
        documents,
        aggregations,
        total: hits.and_then(|h| h.get("total")).map_or(0, read_total),
        scroll_id: response.get("_scroll_id").and_then(Value::as_str).map(str::to_string),
        took: response.get("took").and_then(Value::as_u64),
    }
}

/// Integer totals and the `{value, relation}` shape are both accepted.
fn read_total(total: &Value) -> u64 {
    match total {
        Value::Object(m) => m.get("value").and_then(Value::as_u64).unwrap_or(0),
        other => other.as_u64().unwrap_or(0),
    }
}

/// `_source` plus an injected `id`, the hit's `sort` values as `_sort` when present, and
/// optionally inner hits grouped by relation type as `{_id, ...source}` entries.
#[must_use]
pub fn document_from_hit(hit: &Value, include_inner_hits: bool) -> Document {
    let mut document = match hit.get("_source") {
        Some(Value::Object(source)) => source.clone(),
        _ => Document::new(),
    };
    document.insert("id".into(), hit.get("_id").cloned().unwrap_or(Value::Null));
    if let Some(sort) = hit.get("sort").filter(|s| !s.is_null()) {
        document.insert("_sort".into(), sort.clone());
    }
    if include_inner_hits && let Some(Value::Object(inner)) = hit.get("inner_hits") {
        let mut grouped = Map::new();
        for (relation, results) in inner {
            let entries = results
                .get("hits")
                .and_then(|h| h.get("hits"))
                .and_then(Value::as_array)
                .map(|list| list.iter().map(flatten_inner_hit).collect::<Vec<_>>())
                .unwrap_or_default();
            if !entries.is_empty() {
                grouped.insert(relation.clone(), Value::Array(entries));
            }
        }
        if !grouped.is_empty() {
            document.insert("inner_hits".into(), Value::Object(grouped));
        }
    }
    document
}

fn flatten_inner_hit(hit: &Value) -> Value {
    let mut flat = Map::new();
    flat.insert("_id".into(), hit.get("_id").cloned().unwrap_or(Value::Null));
    if let Some(Value::Object(source)) = hit.get("_source") {
        for (k, v) in source {
            flat.insert(k.clone(), v.clone());
        }
    }
    Value::Object(flat)
}
