#![allow(dead_code)]

use nexus_query::query::{Operation, Transport, TransportResult};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::VecDeque;

/// Replays queued responses in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResult>>,
    requests: Mutex<Vec<(Operation, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: Value) -> &Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.responses.lock().push_back(Err(message.to_string().into()));
        self
    }

    pub fn requests(&self) -> Vec<(Operation, Value)> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, operation: Operation, request: &Value) -> TransportResult {
        self.requests.lock().push((operation, request.clone()));
        self.responses.lock().pop_front().unwrap_or_else(|| Ok(json!({})))
    }
}

/// A search response page of `ids`, carrying `scroll_id` and `total`.
pub fn page(ids: std::ops::Range<u32>, scroll_id: &str, total: u64) -> Value {
    let hits: Vec<Value> = ids
        .map(|i| json!({"_id": i.to_string(), "_source": {"n": i}}))
        .collect();
    json!({
        "_scroll_id": scroll_id,
        "took": 3,
        "hits": {"total": {"value": total, "relation": "eq"}, "hits": hits}
    })
}
