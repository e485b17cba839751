use serde_json::{Map, Value, json};
use std::time::Instant;

use super::compile::QueryCompiler;
use super::cursor::{DocumentCursor, ScrollCursor};
use super::processor::{AggregationResult, SearchResults, process};
use super::telemetry;
use super::types::{Direction, Options, QueryRequest};
use crate::config::SearchConfig;
use crate::errors::SearchError;
use crate::types::Document;
use crate::utils::json::is_truthy;

/// Engine endpoints the core calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    Scroll,
    Bulk,
    DeleteByQuery,
    Index,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Scroll => "scroll",
            Self::Bulk => "bulk",
            Self::DeleteByQuery => "deleteByQuery",
            Self::Index => "index",
        }
    }
}

pub type TransportResult = Result<Value, Box<dyn std::error::Error + Send + Sync>>;

/// The execution collaborator: takes a compiled request and returns the raw response.
/// Blocking; timeouts and retries are the implementation's business.
pub trait Transport {
    /// # Errors
    /// Any failure talking to the engine.
    fn execute(&self, operation: Operation, request: &Value) -> TransportResult;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, operation: Operation, request: &Value) -> TransportResult {
        (**self).execute(operation, request)
    }
}

/// Compiles query descriptions, runs them through a `Transport` and processes responses.
pub struct Connection<T: Transport> {
    transport: T,
    compiler: QueryCompiler,
    config: SearchConfig,
}

impl<T: Transport> Connection<T> {
    #[must_use]
    pub fn new(transport: T, config: SearchConfig) -> Self {
        let compiler = QueryCompiler::new(config.index_suffix.clone());
        Self { transport, compiler, config }
    }

    #[must_use]
    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn with_client_params(&self, mut request: Value) -> Value {
        if let Some(timeout) = self.config.request_timeout_secs
            && let Value::Object(map) = &mut request
        {
            map.insert("client".into(), json!({ "timeout": timeout }));
        }
        request
    }

    /// Execute one request. Transport failures keep the request for diagnostics; a response
    /// flagged with `errors` becomes `SearchError::Bulk`.
    fn run(&self, operation: Operation, request: Value, bindings: Value) -> Result<Value, SearchError> {
        let request = self.with_client_params(request);
        let index = request.get("index").and_then(Value::as_str).unwrap_or("").to_string();
        let start = Instant::now();
        let response = match self.transport.execute(operation, &request) {
            Ok(r) => r,
            Err(source) => {
                telemetry::record_transport_error(operation.as_str());
                return Err(SearchError::Transport {
                    operation: operation.as_str().to_string(),
                    request: Box::new(request),
                    source,
                });
            }
        };
        let dur_ms = start.elapsed().as_millis();
        let body = request.get("body").cloned().unwrap_or(Value::Null);
        let slow = telemetry::log_request(operation.as_str(), &index, &body, dur_ms);
        crate::dev6!(
            "{{\"bench\":\"request\",\"op\":\"{}\",\"index\":\"{}\",\"duration_ms\":{},\"slow\":{}}}",
            operation.as_str(),
            index,
            u64::try_from(dur_ms).unwrap_or(u64::MAX),
            slow
        );
        let failed = response.get("errors").is_some_and(is_truthy);
        if operation == Operation::Bulk {
            telemetry::record_bulk(failed);
        }
        if failed {
            log::warn!("{} on {index} reported item errors", operation.as_str());
            return Err(SearchError::Bulk {
                request: Box::new(request),
                bindings: Box::new(bindings),
                result: Box::new(response),
            });
        }
        Ok(response)
    }

    fn output_bindings(query: &QueryRequest) -> Value {
        Value::Object(query.output.to_map())
    }

    /// # Errors
    /// Compile, transport and bulk errors.
    pub fn select(&self, query: &QueryRequest) -> Result<SearchResults, SearchError> {
        let compiled = self.compiler.compile_select(query)?;
        let response = self.run(Operation::Search, compiled.to_value(), Value::Object(Map::new()))?;
        Ok(process(&response, query.include_inner_hits))
    }

    /// Follow-up page of an open scroll. Only the scroll id and keep-alive are sent.
    ///
    /// # Errors
    /// Transport errors.
    pub fn scroll_page(
        &self,
        scroll_id: &str,
        scroll_time: &str,
        include_inner_hits: bool,
    ) -> Result<SearchResults, SearchError> {
        let request = json!({ "scroll_id": scroll_id, "scroll": scroll_time });
        let response = self.run(Operation::Scroll, request, Value::Object(Map::new()))?;
        Ok(process(&response, include_inner_hits))
    }

    /// # Errors
    /// Compile errors, transport errors, and `SearchError::Bulk` on item failures.
    pub fn insert(&self, query: &QueryRequest, documents: Vec<Document>) -> Result<Value, SearchError> {
        let bulk = self.compiler.compile_insert(query, documents)?;
        self.run(Operation::Bulk, bulk.to_value(), Self::output_bindings(query))
    }

    /// # Errors
    /// Compile errors, transport errors, and `SearchError::Bulk` on item failures.
    pub fn update_by_ids(
        &self,
        query: &QueryRequest,
        documents: Vec<Document>,
    ) -> Result<Value, SearchError> {
        let bulk = self.compiler.compile_update_by_ids(query, documents, false)?;
        self.run(Operation::Bulk, bulk.to_value(), Self::output_bindings(query))
    }

    /// # Errors
    /// Compile errors, transport errors, and `SearchError::Bulk` on item failures.
    pub fn upsert(&self, query: &QueryRequest, documents: Vec<Document>) -> Result<Value, SearchError> {
        let bulk = self.compiler.compile_update_by_ids(query, documents, true)?;
        self.run(Operation::Bulk, bulk.to_value(), Self::output_bindings(query))
    }

    /// Returns the number of deleted documents.
    ///
    /// # Errors
    /// Compile and transport errors.
    pub fn delete_by_query(&self, query: &QueryRequest) -> Result<u64, SearchError> {
        let compiled = self.compiler.compile_delete(query)?;
        let response = self.run(Operation::DeleteByQuery, compiled.to_value(), Self::output_bindings(query))?;
        let deleted = response.get("deleted").and_then(Value::as_u64).unwrap_or(0);
        log::info!("deleted {deleted} documents from {}", compiled.index);
        Ok(deleted)
    }

    /// # Errors
    /// Compile and transport errors.
    pub fn delete_by_id(&self, query: &QueryRequest, id: impl Into<Value>) -> Result<u64, SearchError> {
        let query = query.clone().where_eq("id", id);
        self.delete_by_query(&query)
    }

    /// # Errors
    /// Transport errors.
    pub fn index_document(&self, query: &QueryRequest, document: Document) -> Result<Value, SearchError> {
        let compiled = self.compiler.compile_index(query, document);
        self.run(Operation::Index, compiled.to_value(), Self::output_bindings(query))
    }

    /// Total hits of the query, fetched with a one-document page and no sort or offset.
    ///
    /// # Errors
    /// Compile and transport errors.
    pub fn count_for_pagination(&self, query: &QueryRequest) -> Result<u64, SearchError> {
        let mut count = query.clone();
        count.columns = Some(vec!["_id".to_string()]);
        count.orders.clear();
        count.offset = None;
        count.limit = Some(1);
        Ok(self.select(&count)?.total)
    }

    /// Engine-reported `took` in milliseconds.
    ///
    /// # Errors
    /// Compile and transport errors.
    pub fn search_duration(&self, query: &QueryRequest) -> Result<Option<u64>, SearchError> {
        Ok(self.select(query)?.took)
    }

    /// # Errors
    /// Compile and transport errors.
    pub fn aggregation_results(&self, query: &QueryRequest) -> Result<AggregationResult, SearchError> {
        Ok(self.select(query)?.aggregation_result())
    }

    /// Open a scroll over `query`. Uses the configured keep-alive unless the query sets one.
    #[must_use]
    pub fn scroll(&self, query: &QueryRequest) -> ScrollCursor<'_, T> {
        let mut request = query.clone();
        if request.scroll_time.is_none() {
            request.scroll_time = Some(self.config.scroll_time.clone());
        }
        ScrollCursor::new(self, request)
    }

    /// Lazy, single-pass iteration over every matching document, in pages of
    /// `min(limit, cursor_chunk_size)`, stopping after `limit` documents.
    #[must_use]
    pub fn cursor(&self, query: &QueryRequest) -> DocumentCursor<'_, T> {
        let limit = query.limit;
        let chunk = limit.map_or(self.config.cursor_chunk_size, |l| l.min(self.config.cursor_chunk_size));
        let mut request = query.clone();
        request.limit = Some(chunk);
        DocumentCursor::new(self.scroll(&request), limit)
    }

    /// Feed the query's results to `callback` in scroll pages of `count` documents.
    ///
    /// The callback receives each page and the scroll id that preceded it (`None` for the
    /// first page). Stops after an empty page, a short page, or when the callback returns
    /// `false`, in which case `Ok(false)` is returned. A query without orders is not
    /// rejected: it is sorted by `_doc`.
    ///
    /// # Errors
    /// Compile and transport errors.
    pub fn chunk<F>(&self, query: &QueryRequest, count: u64, mut callback: F) -> Result<bool, SearchError>
    where
        F: FnMut(Vec<Document>, Option<&str>) -> bool,
    {
        let mut request = query.clone();
        if request.orders.is_empty() {
            request = request.order_by("_doc", Direction::Asc, Options::new());
        }
        request.limit = Some(count);
        request.scroll_time = Some(self.config.scroll_time.clone());
        let mut pages = ScrollCursor::new(self, request);
        let mut previous: Option<String> = None;
        while let Some(page) = pages.next_page()? {
            let size = u64::try_from(page.documents.len()).unwrap_or(u64::MAX);
            if !callback(page.documents, previous.as_deref()) {
                return Ok(false);
            }
            previous = page.scroll_id;
            if size != count {
                break;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Replay {
        responses: Mutex<VecDeque<TransportResult>>,
        seen: Mutex<Vec<(Operation, Value)>>,
    }

    impl Transport for Replay {
        fn execute(&self, operation: Operation, request: &Value) -> TransportResult {
            self.seen.lock().push((operation, request.clone()));
            self.responses.lock().pop_front().unwrap_or_else(|| Ok(json!({})))
        }
    }

    #[test]
    fn client_timeout_is_attached() {
        let transport = Replay::default();
        let config = SearchConfig { request_timeout_secs: Some(30), ..SearchConfig::default() };
        let conn = Connection::new(&transport, config);
        conn.select(&QueryRequest::new("posts")).unwrap();
        let seen = transport.seen.lock();
        assert_eq!(seen[0].0, Operation::Search);
        assert_eq!(seen[0].1["client"], json!({"timeout": 30}));
    }

    #[test]
    fn bench_line_per_request() {
        let transport = Replay::default();
        let conn = Connection::new(&transport, SearchConfig::default());
        let _g = crate::utils::devlog::capture();
        conn.select(&QueryRequest::new("posts")).unwrap();
        let lines = crate::utils::devlog::take();
        assert_eq!(lines.len(), 1);
        let bench: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(bench["op"], json!("search"));
        assert_eq!(bench["index"], json!("posts"));
    }

    #[test]
    fn transport_failure_keeps_request() {
        let transport = Replay::default();
        transport.responses.lock().push_back(Err("connection refused".into()));
        let conn = Connection::new(&transport, SearchConfig::default());
        let err = conn.select(&QueryRequest::new("posts")).unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.request().and_then(|r| r.get("index")), Some(&json!("posts")));
    }

    #[test]
    fn item_errors_become_bulk_error() {
        let transport = Replay::default();
        transport.responses.lock().push_back(Ok(json!({"errors": true, "items": []})));
        let conn = Connection::new(&transport, SearchConfig::default());
        let mut doc = Document::new();
        doc.insert("id".into(), json!("1"));
        let query = QueryRequest::new("posts").with_refresh("true").unwrap();
        let err = conn.insert(&query, vec![doc]).unwrap_err();
        match err {
            SearchError::Bulk { bindings, result, .. } => {
                assert_eq!(*bindings, json!({"refresh": "true"}));
                assert_eq!(result["errors"], json!(true));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
