//! Bulk write compilation: alternating action-header and body lines for insert,
//! update-by-id and upsert.
//!
//! Per document the parent pair is emitted first, followed by one pair per entry of its
//! `child_documents` list (`{id, document}` objects). Children address the owning document
//! through `parent`.

use serde_json::{Map, Value};

use super::compile::QueryCompiler;
use super::types::QueryRequest;
use crate::errors::CompileError;
use crate::types::Document;

const CHILD_DOCUMENTS: &str = "child_documents";
const SORT_CURSOR: &str = "_sort";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkMode {
    Index,
    Update { upsert: bool },
}

impl BulkMode {
    fn action(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Update { .. } => "update",
        }
    }

    fn body(self, document: Value) -> Value {
        match self {
            Self::Index => document,
            Self::Update { upsert } => {
                let mut wrapped = Map::with_capacity(2);
                wrapped.insert("doc".into(), document);
                wrapped.insert("doc_as_upsert".into(), Value::Bool(upsert));
                Value::Object(wrapped)
            }
        }
    }
}

/// A compiled bulk request. `lines` alternate header, body, header, body, ...
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkRequest {
    pub lines: Vec<Value>,
    pub params: Map<String, Value>,
}

impl BulkRequest {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = Map::with_capacity(1 + self.params.len());
        out.insert("body".into(), Value::Array(self.lines.clone()));
        for (k, v) in &self.params {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }

    /// Newline-delimited rendering, one JSON object per line, newline-terminated.
    #[must_use]
    pub fn to_ndjson(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.lines.len() / 2
    }
}

impl QueryCompiler {
    /// # Errors
    /// A child entry without a `document`.
    pub fn compile_insert(
        &self,
        request: &QueryRequest,
        documents: Vec<Document>,
    ) -> Result<BulkRequest, CompileError> {
        self.compile_bulk(request, documents, BulkMode::Index)
    }

    /// `upsert` sets `doc_as_upsert` on every update action.
    ///
    /// # Errors
    /// A document or child without an `id`, or a child without a `document`.
    pub fn compile_update_by_ids(
        &self,
        request: &QueryRequest,
        documents: Vec<Document>,
        upsert: bool,
    ) -> Result<BulkRequest, CompileError> {
        self.compile_bulk(request, documents, BulkMode::Update { upsert })
    }

    fn compile_bulk(
        &self,
        request: &QueryRequest,
        documents: Vec<Document>,
        mode: BulkMode,
    ) -> Result<BulkRequest, CompileError> {
        let index = self.index_name(&request.index);
        let mut lines = Vec::with_capacity(documents.len() * 2);
        for mut doc in documents {
            doc.shift_remove(SORT_CURSOR);
            let children = doc.shift_remove(CHILD_DOCUMENTS);
            let parent_id = doc.get("id").filter(|v| !v.is_null()).cloned();

            let mut header = Map::new();
            header.insert("_index".into(), Value::String(index.clone()));
            if let Some(id) = parent_id.clone() {
                header.insert("_id".into(), id);
            } else if matches!(mode, BulkMode::Update { .. }) {
                return Err(CompileError::MissingField {
                    context: "update action".into(),
                    field: "id".into(),
                });
            }
            match doc.shift_remove("_routing").filter(|v| !v.is_null()) {
                Some(routing) => {
                    header.insert("routing".into(), routing);
                }
                None => {
                    if let Some(routing) = &request.routing {
                        header.insert("routing".into(), Value::String(routing.clone()));
                    }
                }
            }
            if let Some(parent) = &request.parent_id {
                header.insert("parent".into(), Value::String(parent.clone()));
            } else if let Some(parent) = doc.shift_remove("_parent").filter(|v| !v.is_null()) {
                header.insert("parent".into(), parent);
            }

            lines.push(single_action(mode, header));
            lines.push(mode.body(Value::Object(doc)));

            if let Some(Value::Array(children)) = children {
                for child in children {
                    let (header, body) = compile_child(&index, parent_id.as_ref(), child, mode)?;
                    lines.push(header);
                    lines.push(body);
                }
            }
        }
        log::debug!("compiled bulk {} on {index}: {} actions", mode.action(), lines.len() / 2);
        Ok(BulkRequest { lines, params: request.output.to_map() })
    }
}

fn compile_child(
    index: &str,
    parent_id: Option<&Value>,
    child: Value,
    mode: BulkMode,
) -> Result<(Value, Value), CompileError> {
    let Value::Object(mut child) = child else {
        return Err(CompileError::InvalidClause("child document entries must be objects".into()));
    };
    let mut document = match child.shift_remove("document") {
        Some(Value::Object(d)) => d,
        _ => {
            return Err(CompileError::MissingField {
                context: "child document".into(),
                field: "document".into(),
            });
        }
    };
    document.shift_remove(SORT_CURSOR);

    let mut header = Map::new();
    header.insert("_index".into(), Value::String(index.to_string()));
    match child.shift_remove("id").filter(|v| !v.is_null()) {
        Some(id) => {
            header.insert("_id".into(), id);
        }
        None if matches!(mode, BulkMode::Update { .. }) => {
            return Err(CompileError::MissingField {
                context: "child update action".into(),
                field: "id".into(),
            });
        }
        None => {}
    }
    if let Some(parent) = parent_id {
        header.insert("parent".into(), parent.clone());
    }
    Ok((single_action(mode, header), mode.body(Value::Object(document))))
}

fn single_action(mode: BulkMode, header: Map<String, Value>) -> Value {
    let mut action = Map::with_capacity(1);
    action.insert(mode.action().into(), Value::Object(header));
    Value::Object(action)
}
