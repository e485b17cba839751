//! Clause compilation: per-kind rules, option application and the and/or composition of
//! clause lists, plus whole-request compilation for search, delete-by-query and single
//! document writes.

use serde_json::{Map, Value, json};

use super::merge::merge_into;
use super::types::{Clause, ClauseKind, Operator, Options, OrderSpec, QueryRequest};
use crate::errors::CompileError;
use crate::types::Document;
use crate::utils::json::{empty_object, first_entry_mut, is_truthy, non_empty, single};

/// The three compiled clause lists of one request. An empty map means "no clauses".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledClauses {
    pub query: Map<String, Value>,
    pub filter: Map<String, Value>,
    pub post_filter: Map<String, Value>,
}

impl CompiledClauses {
    fn into_named_parts(self) -> [(&'static str, Map<String, Value>); 3] {
        [("query", self.query), ("filter", self.filter), ("postFilter", self.post_filter)]
    }
}

/// A request ready for the transport: target index, body, and top-level parameters
/// (scroll, write options, client options) in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledRequest {
    pub index: String,
    pub body: Map<String, Value>,
    pub params: Map<String, Value>,
}

impl CompiledRequest {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = Map::with_capacity(2 + self.params.len());
        out.insert("index".into(), Value::String(self.index.clone()));
        out.insert("body".into(), Value::Object(self.body.clone()));
        for (k, v) in &self.params {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }

    #[must_use]
    pub fn query(&self) -> Option<&Value> {
        self.body.get("query")
    }
}

/// Stateless compiler. The index suffix is fixed at construction and appended to every
/// target index name.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    index_suffix: String,
}

impl QueryCompiler {
    #[must_use]
    pub fn new(index_suffix: impl Into<String>) -> Self {
        Self { index_suffix: index_suffix.into() }
    }

    #[must_use]
    pub fn index_suffix(&self) -> &str {
        &self.index_suffix
    }

    #[must_use]
    pub fn index_name(&self, index: &str) -> String {
        format!("{index}{}", self.index_suffix)
    }

    /// # Errors
    /// Propagates the first structural error found in any clause list.
    pub fn compile_wheres(&self, request: &QueryRequest) -> Result<CompiledClauses, CompileError> {
        Ok(CompiledClauses {
            query: self.compile_clauses(&request.primary)?,
            filter: self.compile_clauses(&request.filter)?,
            post_filter: self.compile_clauses(&request.post_filter)?,
        })
    }

    /// Compose a clause list into one tree.
    ///
    /// `and` clauses are wrapped as `{bool:{must:[c]}}` and key-union merged into the
    /// accumulator. The first `or` clause demotes whatever was accumulated into
    /// `{bool:{should:[acc]}}`; from then on every clause is appended to that `should`
    /// array (`and` clauses still wrapped, `or` clauses raw).
    ///
    /// # Errors
    /// Propagates the first clause compile error.
    pub fn compile_clauses(&self, clauses: &[Clause]) -> Result<Map<String, Value>, CompileError> {
        let mut query = Map::new();
        let mut is_or = false;
        for clause in clauses {
            let compiled = self.compile_clause(clause)?;
            if clause.is_or() {
                if !is_or {
                    is_or = true;
                    query = demote_to_should(query);
                }
                push_should(&mut query, compiled);
            } else if is_or {
                push_should(&mut query, Value::Object(must_of(compiled)));
            } else {
                merge_into(&mut query, must_of(compiled));
            }
        }
        Ok(query)
    }

    /// Compile a single clause with its kind-specific rule.
    ///
    /// Option handling: `boost`/`inner_hits` are applied by the rule itself for kinds that
    /// wrap their node afterwards, generically for the plain kinds, and not at all for kinds
    /// whose options are their own configuration. `negate` is consumed by `Basic`, `Null`,
    /// `NotNull`, `Date` and `Between`; for every other kind it wraps the result in
    /// `must_not`.
    ///
    /// # Errors
    /// Relationship clauses with both a query and a filter context, and any error from a
    /// sub-query.
    pub fn compile_clause(&self, clause: &Clause) -> Result<Value, CompileError> {
        let options = &clause.options;
        let negate = clause.negate;
        let node = match &clause.kind {
            ClauseKind::Basic { column, operator, value } => {
                return Ok(compile_basic(column, *operator, value, negate, options));
            }
            ClauseKind::Null { column } => {
                return Ok(compile_basic(column, Operator::Exists, &Value::Bool(false), negate, options));
            }
            ClauseKind::NotNull { column } => {
                return Ok(compile_basic(column, Operator::Exists, &Value::Bool(true), negate, options));
            }
            ClauseKind::Date { column, operator, value } => {
                return Ok(if *operator == Operator::Eq {
                    apply_options(compile_between(column, value, value, negate), options)
                } else {
                    compile_basic(column, *operator, value, negate, options)
                });
            }
            ClauseKind::Between { column, low, high } => {
                return Ok(apply_options(compile_between(column, low, high, negate), options));
            }
            ClauseKind::In { column, values } => {
                apply_options(compile_terms(column, values), options)
            }
            ClauseKind::NotIn { column, values } => {
                must_not(apply_options(compile_terms(column, values), options))
            }
            ClauseKind::Nested { query } => self.compile_nested(query, options)?,
            ClauseKind::Not { query } => {
                let compiled = self.compile_wheres(query)?;
                apply_options(must_not(Value::Object(compiled.query)), options)
            }
            ClauseKind::Prefix { column, value } => {
                apply_options(single("prefix", single(column.as_str(), value.clone())), options)
            }
            ClauseKind::Script { script } => {
                let mut body = options.clone();
                body.insert("source".into(), Value::String(script.clone()));
                single("script", single("script", Value::Object(body)))
            }
            ClauseKind::Search { query } => compile_search(query, options),
            ClauseKind::GeoDistance { column, location, distance } => {
                let mut body = Map::new();
                body.insert("distance".into(), Value::String(distance.clone()));
                body.insert(column.clone(), location.clone());
                apply_options(single("geo_distance", Value::Object(body)), options)
            }
            ClauseKind::GeoBoundsIn { column, bounds } => apply_options(
                single("geo_bounding_box", single(column.as_str(), bounds.clone())),
                options,
            ),
            ClauseKind::ParentId { relation_type, id } => apply_options(
                json!({ "parent_id": { "type": relation_type, "id": id } }),
                options,
            ),
            ClauseKind::Parent { document_type, query } => {
                apply_options(self.compile_relationship("parent", document_type, query)?, options)
            }
            ClauseKind::Child { document_type, query } => {
                apply_options(self.compile_relationship("child", document_type, query)?, options)
            }
            ClauseKind::NestedDoc { column, query, operator } => {
                let node = apply_options(self.compile_nested_doc(column, query)?, options);
                if *operator == Operator::Ne { must_not(node) } else { node }
            }
            ClauseKind::FunctionScore { function_type } => {
                single("function_score", single(function_type.as_str(), Value::Object(options.clone())))
            }
            ClauseKind::QueryString { value } => {
                let mut body = options.clone();
                body.insert("query".into(), value.clone());
                single("query_string", Value::Object(body))
            }
            ClauseKind::Wildcard { column, value } => {
                let mut body = Map::new();
                body.insert("value".into(), value.clone());
                body.insert("boost".into(), option_or(options, "boost", json!(1.0)));
                body.insert("rewrite".into(), option_or(options, "rewrite", json!("constant_score")));
                body.insert(
                    "case_insensitive".into(),
                    option_or(options, "case_insensitive", json!(false)),
                );
                single("wildcard", single(column.as_str(), Value::Object(body)))
            }
            ClauseKind::Regexp { column, value } => {
                let mut body = Map::new();
                body.insert("value".into(), value.clone());
                body.insert("flags".into(), option_or(options, "flags", json!("ALL")));
                body.insert(
                    "case_insensitive".into(),
                    option_or(options, "case_insensitive", json!(false)),
                );
                body.insert(
                    "max_determinized_states".into(),
                    option_or(options, "max_determinized_states", json!(10000)),
                );
                body.insert("rewrite".into(), option_or(options, "rewrite", json!("constant_score")));
                single("regexp", single(column.as_str(), Value::Object(body)))
            }
        };
        Ok(if negate { must_not(node) } else { node })
    }

    fn compile_nested(&self, query: &QueryRequest, options: &Options) -> Result<Value, CompileError> {
        let compiled = self.compile_wheres(query)?;
        Ok(compiled
            .into_named_parts()
            .into_iter()
            .map(|(_, part)| part)
            .find(|part| !part.is_empty())
            .map_or_else(match_all, |part| apply_options(Value::Object(part), options)))
    }

    fn compile_relationship(
        &self,
        relation: &str,
        document_type: &str,
        query: &QueryRequest,
    ) -> Result<Value, CompileError> {
        let compiled = self.compile_wheres(query)?;
        let inner = match (compiled.query.is_empty(), compiled.filter.is_empty()) {
            (true, true) => match_all(),
            (true, false) => Value::Object(compiled.filter),
            (false, true) => Value::Object(compiled.query),
            (false, false) => {
                return Err(CompileError::ConflictingRelationContext { relation: relation.to_string() });
            }
        };
        let type_key = if relation == "parent" { "parent_type" } else { "type" };
        let mut body = Map::new();
        body.insert(type_key.into(), Value::String(document_type.to_string()));
        body.insert("query".into(), inner);
        Ok(single(format!("has_{relation}"), Value::Object(body)))
    }

    fn compile_nested_doc(&self, column: &str, query: &QueryRequest) -> Result<Value, CompileError> {
        let compiled = self.compile_wheres(query)?;
        let mut nested = Map::new();
        nested.insert("path".into(), Value::String(column.to_string()));
        for (name, part) in compiled.into_named_parts() {
            if !part.is_empty() {
                nested.insert(name.into(), Value::Object(part));
            }
        }
        Ok(single("nested", Value::Object(nested)))
    }

    /// # Errors
    /// Any clause or aggregation compile error.
    pub fn compile_select(&self, request: &QueryRequest) -> Result<CompiledRequest, CompileError> {
        let CompiledClauses { mut query, filter, post_filter } = self.compile_wheres(request)?;
        let mut body = Map::new();
        let source = match &request.columns {
            Some(cols) if !cols.is_empty() && !cols.iter().any(|c| c == "*") => json!(cols),
            _ => Value::Bool(true),
        };
        body.insert("_source".into(), source);

        if !filter.is_empty() {
            let bool_node = query.entry("bool").or_insert_with(empty_object);
            if let Value::Object(b) = bool_node {
                b.insert("filter".into(), Value::Object(filter));
            }
        }
        if !query.is_empty() {
            body.insert("query".into(), Value::Object(query));
        }
        if !post_filter.is_empty() {
            body.insert("post_filter".into(), Value::Object(post_filter));
        }
        if !request.aggregations.is_empty() {
            body.insert(
                "aggregations".into(),
                Value::Object(self.compile_aggregations(&request.aggregations)?),
            );
        }
        if !request.orders.is_empty() {
            body.insert("sort".into(), compile_orders(&request.orders));
        }
        if let Some(offset) = request.offset.filter(|o| *o != 0) {
            body.insert("from".into(), json!(offset));
        }
        if let Some(limit) = request.limit {
            body.insert("size".into(), json!(limit));
        }
        if request.track_total_hits {
            body.insert("track_total_hits".into(), Value::Bool(true));
        }
        if let Some(after) = request.search_after.as_ref().filter(|a| !a.is_empty()) {
            body.insert("search_after".into(), Value::Array(after.clone()));
        }

        let mut params = Map::new();
        if let Some(id) = &request.scroll_id {
            params.insert("scroll_id".into(), Value::String(id.clone()));
        }
        if let Some(time) = &request.scroll_time {
            params.insert("scroll".into(), Value::String(time.clone()));
        }
        log::debug!(
            "compiled select on {}{} ({} clauses, {} aggregations)",
            request.index,
            self.index_suffix,
            request.primary.len() + request.filter.len() + request.post_filter.len(),
            request.aggregations.len()
        );
        Ok(CompiledRequest { index: self.index_name(&request.index), body, params })
    }

    /// Select compilation plus the write options at the top level.
    ///
    /// # Errors
    /// Any clause or aggregation compile error.
    pub fn compile_delete(&self, request: &QueryRequest) -> Result<CompiledRequest, CompileError> {
        let mut compiled = self.compile_select(request)?;
        for (k, v) in request.output.to_map() {
            compiled.params.insert(k, v);
        }
        Ok(compiled)
    }

    /// A single document write. `_routing` in the document wins over the request routing
    /// and is removed from the body. The `_sort` cursor field is never written.
    #[must_use]
    pub fn compile_index(&self, request: &QueryRequest, document: Document) -> CompiledRequest {
        let mut body = Map::with_capacity(document.len());
        let mut routing = None;
        for (k, v) in document {
            match k.as_str() {
                "_sort" => {}
                "_routing" => routing = Some(v),
                _ => {
                    body.insert(k, v);
                }
            }
        }
        let mut params = Map::new();
        if let Some(id) = body.get("id").filter(|v| !v.is_null()) {
            params.insert("id".into(), id.clone());
        }
        if let Some(r) = routing.or_else(|| request.routing.clone().map(Value::String)) {
            params.insert("routing".into(), r);
        }
        for (k, v) in request.output.to_map() {
            params.insert(k, v);
        }
        CompiledRequest { index: self.index_name(&request.index), body, params }
    }
}

fn compile_basic(
    column: &str,
    operator: Operator,
    value: &Value,
    negate: bool,
    options: &Options,
) -> Value {
    let mut negate = negate;
    let node = if operator == Operator::Exists || value.is_null() {
        negate = !is_truthy(value);
        json!({ "exists": { "field": column } })
    } else if let Some(key) = operator.range_key() {
        single("range", single(column, single(key, value.clone())))
    } else {
        single("term", single(column, value.clone()))
    };
    let node = apply_options(node, options);
    if negate
        || (operator == Operator::Ne && !value.is_null())
        || (operator == Operator::Eq && value.is_null())
    {
        must_not(node)
    } else {
        node
    }
}

/// Negated form is the union of the two open half-ranges `<= low` and `>= high`.
fn compile_between(column: &str, low: &Value, high: &Value, negate: bool) -> Value {
    if negate {
        json!({ "bool": { "should": [
            single("range", single(column, json!({ "lte": low }))),
            single("range", single(column, json!({ "gte": high }))),
        ] } })
    } else {
        single("range", single(column, json!({ "gte": low, "lte": high })))
    }
}

fn compile_terms(column: &str, values: &[Value]) -> Value {
    single("terms", single(column, Value::Array(values.to_vec())))
}

fn compile_search(query: &str, options: &Options) -> Value {
    let fields: Vec<String> = match non_empty(options, "fields") {
        None => vec!["_all".to_string()],
        Some(Value::Object(weighted)) => {
            weighted.iter().map(|(f, boost)| format!("{f}^{}", plain(boost))).collect()
        }
        Some(Value::Array(list)) => list.iter().map(plain).collect(),
        Some(other) => vec![plain(other)],
    };
    let fuzziness = non_empty(options, "fuzziness");

    let mut node = if fields.len() > 1 {
        let match_type = options
            .get("matchType")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| json!("most_fields"));
        let mut body = Map::new();
        body.insert("query".into(), Value::String(query.to_string()));
        body.insert("type".into(), match_type);
        body.insert("fields".into(), json!(fields));
        if let Some(f) = fuzziness {
            body.insert("fuzziness".into(), f.clone());
        }
        single("multi_match", Value::Object(body))
    } else {
        let field = fields.first().cloned().unwrap_or_else(|| "_all".to_string());
        let mut body = Map::new();
        body.insert("query".into(), Value::String(query.to_string()));
        if let Some(f) = fuzziness {
            body.insert("fuzziness".into(), f.clone());
        }
        single("match", single(field, Value::Object(body)))
    };
    if non_empty(options, "constant_score").is_some() {
        node = json!({ "constant_score": { "query": node } });
    }
    node
}

fn compile_orders(orders: &[OrderSpec]) -> Value {
    Value::Array(
        orders
            .iter()
            .map(|order| {
                let direction = Value::String(order.direction.as_str().to_string());
                let extra = order.options.iter().filter(|(k, _)| k.as_str() != "type");
                let mut spec = Map::new();
                if order.kind == "basic" {
                    spec.insert("order".into(), direction);
                    spec.extend(extra.map(|(k, v)| (k.clone(), v.clone())));
                    single(order.column.as_str(), Value::Object(spec))
                } else {
                    spec.extend(extra.map(|(k, v)| (k.clone(), v.clone())));
                    spec.insert("order".into(), direction);
                    single(format!("_{}", order.kind), Value::Object(spec))
                }
            })
            .collect(),
    )
}

/// Apply the generic `boost` and `inner_hits` options, in option order, to the node's
/// single top-level key.
pub(crate) fn apply_options(mut node: Value, options: &Options) -> Value {
    for (name, value) in options {
        match name.as_str() {
            "boost" => apply_boost(&mut node, value.clone()),
            "inner_hits" => apply_inner_hits(&mut node, value),
            _ => {}
        }
    }
    node
}

/// `term` nodes are rewritten to `{term:{field:{value, boost}}}`; any other node gets a
/// `boost` key beside its parameters.
fn apply_boost(node: &mut Value, boost: Value) {
    if let Some(map) = node.as_object_mut()
        && let Some((key, inner)) = first_entry_mut(map)
        && let Some(inner) = inner.as_object_mut()
    {
        if key == "term" {
            if let Some((_, term_value)) = first_entry_mut(inner) {
                let value = term_value.take();
                *term_value = json!({ "value": value, "boost": boost });
            }
        } else {
            inner.insert("boost".into(), boost);
        }
    }
}

fn apply_inner_hits(node: &mut Value, value: &Value) {
    let hits = if !is_truthy(value) || *value == Value::Bool(true) {
        empty_object()
    } else {
        value.clone()
    };
    if let Some(map) = node.as_object_mut()
        && let Some((_, inner)) = first_entry_mut(map)
        && let Some(inner) = inner.as_object_mut()
    {
        inner.insert("inner_hits".into(), hits);
    }
}

fn must_not(node: Value) -> Value {
    json!({ "bool": { "must_not": [node] } })
}

fn must_of(node: Value) -> Map<String, Value> {
    let mut must = Map::new();
    must.insert("must".into(), Value::Array(vec![node]));
    let mut wrapped = Map::new();
    wrapped.insert("bool".into(), Value::Object(must));
    wrapped
}

fn match_all() -> Value {
    json!({ "match_all": {} })
}

fn demote_to_should(acc: Map<String, Value>) -> Map<String, Value> {
    let should = if acc.is_empty() { Vec::new() } else { vec![Value::Object(acc)] };
    let mut b = Map::new();
    b.insert("should".into(), Value::Array(should));
    let mut out = Map::new();
    out.insert("bool".into(), Value::Object(b));
    out
}

fn push_should(query: &mut Map<String, Value>, node: Value) {
    if let Some(Value::Array(should)) = query.get_mut("bool").and_then(|b| b.get_mut("should")) {
        should.push(node);
    }
}

fn option_or(options: &Options, key: &str, default: Value) -> Value {
    options.get(key).filter(|v| !v.is_null()).cloned().unwrap_or(default)
}

fn plain(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
