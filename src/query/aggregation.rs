//! Aggregation forest compilation.
//!
//! Known kinds dispatch to a dedicated rule and land under their `key`. Unknown kinds are a
//! passthrough, `{key: {snake_case(kind): args}}`, so engine aggregations without a rule
//! here remain usable.

use serde_json::{Map, Value, json};

use super::compile::QueryCompiler;
use super::types::{AggregationArgs, AggregationKind, AggregationSpec, QueryRequest};
use crate::errors::CompileError;
use crate::utils::json::{is_truthy, single, snake_case};

const TERMS_PASSTHROUGH: &[&str] = &[
    "collect_mode",
    "exclude",
    "execution_hint",
    "include",
    "min_doc_count",
    "missing",
    "order",
    "script",
    "show_term_doc_count_error",
    "size",
];

impl QueryCompiler {
    /// Compile sibling aggregations into one map keyed by aggregation key. A later sibling
    /// with the same key replaces the earlier one.
    ///
    /// # Errors
    /// Missing required arguments (`field`, `path`, `type`) and errors from filter sub-queries.
    pub fn compile_aggregations(
        &self,
        aggregations: &[AggregationSpec],
    ) -> Result<Map<String, Value>, CompileError> {
        let mut out = Map::new();
        for spec in aggregations {
            let mut node = self.compile_aggregation(spec)?;
            if !spec.sub_aggregations.is_empty() {
                let subs = self.compile_aggregations(&spec.sub_aggregations)?;
                node.insert("aggregations".into(), Value::Object(subs));
            }
            out.insert(spec.key.clone(), Value::Object(node));
        }
        Ok(out)
    }

    fn compile_aggregation(&self, spec: &AggregationSpec) -> Result<Map<String, Value>, CompileError> {
        let node = match &spec.kind {
            AggregationKind::Filter => {
                let AggregationArgs::Query(query) = &spec.args else {
                    return Err(CompileError::InvalidClause(format!(
                        "filter aggregation `{}` needs a sub-query",
                        spec.key
                    )));
                };
                single("filter", self.compile_filter_aggregation(query)?)
            }
            AggregationKind::Terms => {
                let mut terms = Map::new();
                terms.insert("field".into(), required(spec, "field")?);
                if let AggregationArgs::Value(Value::Object(args)) = &spec.args {
                    for (k, v) in args {
                        if TERMS_PASSTHROUGH.contains(&k.as_str()) {
                            terms.insert(k.clone(), v.clone());
                        }
                    }
                }
                single("terms", Value::Object(terms))
            }
            AggregationKind::Nested => single("nested", json!({ "path": required(spec, "path")? })),
            AggregationKind::Cardinality => {
                let mut body = Map::new();
                body.insert("field".into(), required(spec, "field")?);
                if let AggregationArgs::Value(Value::Object(args)) = &spec.args
                    && let Some(threshold) = args.get("precision_threshold").filter(|v| is_truthy(v))
                {
                    body.insert("precision_threshold".into(), threshold.clone());
                }
                single("cardinality", Value::Object(body))
            }
            AggregationKind::DateHistogram => single("date_histogram", field_or_args(spec)),
            AggregationKind::DateRange => single("date_range", field_or_args(spec)),
            AggregationKind::Exists => single("exists", json!({ "field": required(spec, "field")? })),
            AggregationKind::Children => {
                single("children", json!({ "type": required(spec, "type")? }))
            }
            AggregationKind::Metric(metric) => single(metric.as_str(), metric_args(spec)?),
            AggregationKind::Custom(name) => {
                let args = match &spec.args {
                    AggregationArgs::Value(v) => v.clone(),
                    AggregationArgs::Query(q) => Value::Object(self.compile_filter_body(q)?),
                };
                single(snake_case(name), args)
            }
        };
        Ok(match node {
            Value::Object(map) => map,
            _ => Map::new(),
        })
    }

    /// Query and filter parts shallow-merged (filter keys win); `match_all` when both empty.
    fn compile_filter_aggregation(&self, query: &QueryRequest) -> Result<Value, CompileError> {
        let merged = self.compile_filter_body(query)?;
        Ok(if merged.is_empty() { json!({ "match_all": {} }) } else { Value::Object(merged) })
    }

    fn compile_filter_body(&self, query: &QueryRequest) -> Result<Map<String, Value>, CompileError> {
        let compiled = self.compile_wheres(query)?;
        let mut merged = compiled.query;
        for (k, v) in compiled.filter {
            merged.insert(k, v);
        }
        Ok(merged)
    }
}

/// A bare field name or an argument map carrying `name`.
fn required(spec: &AggregationSpec, name: &str) -> Result<Value, CompileError> {
    let missing = || CompileError::MissingField {
        context: format!("aggregation `{}`", spec.key),
        field: name.to_string(),
    };
    match &spec.args {
        AggregationArgs::Value(Value::Object(args)) => args.get(name).cloned().ok_or_else(missing),
        AggregationArgs::Value(Value::Null) | AggregationArgs::Query(_) => Err(missing()),
        AggregationArgs::Value(bare) => Ok(bare.clone()),
    }
}

/// A bare field name becomes `{field}`; argument maps pass through whole and need a
/// `field` or a `script`.
fn metric_args(spec: &AggregationSpec) -> Result<Value, CompileError> {
    match &spec.args {
        AggregationArgs::Value(Value::Object(args))
            if args.contains_key("field") || args.contains_key("script") =>
        {
            Ok(Value::Object(args.clone()))
        }
        _ => Ok(json!({ "field": required(spec, "field")? })),
    }
}

/// Argument maps pass through unchanged; a bare field name becomes `{field}`.
fn field_or_args(spec: &AggregationSpec) -> Value {
    match &spec.args {
        AggregationArgs::Value(Value::Object(args)) => Value::Object(args.clone()),
        AggregationArgs::Value(bare) => json!({ "field": bare }),
        AggregationArgs::Query(_) => json!({}),
    }
}
