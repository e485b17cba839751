use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{
    AggregationArgs, AggregationKind, AggregationSpec, Boolean, Clause, ClauseKind, Direction,
    Operator, Options, OrderSpec, QueryRequest,
};
use crate::errors::{CompileError, SearchError};
use crate::utils::json::snake_case;

// Serde-facing structures for JSON query descriptions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequestSerde {
    #[serde(default)]
    pub index: String,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub wheres: Vec<ClauseSerde>,
    #[serde(default)]
    pub filters: Vec<ClauseSerde>,
    #[serde(default)]
    pub post_filters: Vec<ClauseSerde>,
    #[serde(default)]
    pub orders: Vec<OrderSerde>,
    #[serde(default)]
    pub aggregations: Vec<AggregationSerde>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub routing: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub track_total_hits: bool,
    #[serde(default)]
    pub search_after: Option<Vec<Value>>,
    #[serde(default)]
    pub scroll: Option<String>,
    #[serde(default)]
    pub scroll_id: Option<String>,
    #[serde(default)]
    pub inner_hits: bool,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub conflicts: Option<String>,
}

/// One clause, tagged by `type` (`basic`, `notIn`/`not_in`, `geoDistance`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseSerde {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub values: Option<Vec<Value>>,
    #[serde(default)]
    pub query: Option<Box<QueryRequestSerde>>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub boolean: Boolean,
    #[serde(default)]
    pub not: bool,
    #[serde(default)]
    pub options: Options,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSerde {
    pub column: String,
    /// `asc`/`desc` or `1`/`-1`.
    #[serde(default)]
    pub direction: Option<Value>,
    #[serde(default)]
    pub options: Options,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSerde {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Value,
    /// Sub-query for `filter` aggregations.
    #[serde(default)]
    pub query: Option<Box<QueryRequestSerde>>,
    #[serde(default)]
    pub aggregations: Vec<AggregationSerde>,
}

impl TryFrom<QueryRequestSerde> for QueryRequest {
    type Error = CompileError;
    fn try_from(qs: QueryRequestSerde) -> Result<Self, Self::Error> {
        let mut out = Self::new(qs.index);
        out.columns = qs.columns;
        out.primary = convert_clauses(qs.wheres)?;
        out.filter = convert_clauses(qs.filters)?;
        out.post_filter = convert_clauses(qs.post_filters)?;
        out.orders = qs.orders.into_iter().map(OrderSpec::try_from).collect::<Result<_, _>>()?;
        out.aggregations =
            qs.aggregations.into_iter().map(AggregationSpec::try_from).collect::<Result<_, _>>()?;
        out.offset = qs.offset;
        out.limit = qs.limit;
        out.routing = qs.routing;
        out.parent_id = qs.parent_id;
        out.track_total_hits = qs.track_total_hits;
        out.search_after = qs.search_after;
        out.scroll_id = qs.scroll_id;
        out.include_inner_hits = qs.inner_hits;
        if let Some(time) = qs.scroll {
            out = out.scroll_time(&time)?;
        }
        if let Some(refresh) = qs.refresh {
            out = out.with_refresh(&refresh)?;
        }
        if let Some(conflicts) = qs.conflicts {
            out = out.on_conflicts(&conflicts)?;
        }
        Ok(out)
    }
}

fn convert_clauses(list: Vec<ClauseSerde>) -> Result<Vec<Clause>, CompileError> {
    list.into_iter().map(Clause::try_from).collect()
}

fn sub_query(query: Option<Box<QueryRequestSerde>>) -> Result<Box<QueryRequest>, CompileError> {
    Ok(Box::new(QueryRequest::try_from(query.map(|q| *q).unwrap_or_default())?))
}

impl TryFrom<ClauseSerde> for Clause {
    type Error = CompileError;
    fn try_from(cs: ClauseSerde) -> Result<Self, Self::Error> {
        let name = snake_case(&cs.kind);
        let missing = |field: &str| CompileError::MissingField {
            context: format!("{} clause", cs.kind),
            field: field.to_string(),
        };
        let column = || cs.column.clone().ok_or_else(|| missing("column"));
        let value = || cs.value.clone().unwrap_or(Value::Null);
        let text = |field: &str| match &cs.value {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(missing(field)),
        };
        let operator = || cs.operator.as_deref().unwrap_or("=").parse::<Operator>();

        let kind = match name.as_str() {
            "basic" => {
                let (column, operator, value) = (column()?, operator()?, value());
                match (&value, operator) {
                    (Value::Null, Operator::Eq) => ClauseKind::Null { column },
                    (Value::Null, Operator::Ne) => ClauseKind::NotNull { column },
                    _ => ClauseKind::Basic { column, operator, value },
                }
            }
            "in" => ClauseKind::In { column: column()?, values: cs.values.clone().unwrap_or_default() },
            "not_in" => {
                ClauseKind::NotIn { column: column()?, values: cs.values.clone().unwrap_or_default() }
            }
            "between" => {
                let Some([low, high]) = cs.values.clone().and_then(|v| <[Value; 2]>::try_from(v).ok())
                else {
                    return Err(CompileError::InvalidClause(
                        "between clause needs exactly two values".into(),
                    ));
                };
                ClauseKind::Between { column: column()?, low, high }
            }
            "null" => ClauseKind::Null { column: column()? },
            "not_null" => ClauseKind::NotNull { column: column()? },
            "date" => ClauseKind::Date { column: column()?, operator: operator()?, value: value() },
            "nested" => ClauseKind::Nested { query: sub_query(cs.query.clone())? },
            "not" => ClauseKind::Not { query: sub_query(cs.query.clone())? },
            "prefix" => ClauseKind::Prefix { column: column()?, value: value() },
            "script" => ClauseKind::Script { script: text("value")? },
            "search" => ClauseKind::Search { query: text("value")? },
            "geo_distance" => ClauseKind::GeoDistance {
                column: column()?,
                location: value(),
                distance: cs.distance.clone().ok_or_else(|| missing("distance"))?,
            },
            "geo_bounds_in" => ClauseKind::GeoBoundsIn { column: column()?, bounds: value() },
            "parent_id" => ClauseKind::ParentId {
                relation_type: cs.document_type.clone().ok_or_else(|| missing("documentType"))?,
                id: value(),
            },
            "parent" => ClauseKind::Parent {
                document_type: cs.document_type.clone().ok_or_else(|| missing("documentType"))?,
                query: sub_query(cs.query.clone())?,
            },
            "child" => ClauseKind::Child {
                document_type: cs.document_type.clone().ok_or_else(|| missing("documentType"))?,
                query: sub_query(cs.query.clone())?,
            },
            "nested_doc" => ClauseKind::NestedDoc {
                column: column()?,
                query: sub_query(cs.query.clone())?,
                operator: operator()?,
            },
            "function_score" => ClauseKind::FunctionScore { function_type: text("value")? },
            "query_string" => ClauseKind::QueryString { value: value() },
            "wildcard" => ClauseKind::Wildcard { column: column()?, value: value() },
            "regexp" => ClauseKind::Regexp { column: column()?, value: value() },
            _ => return Err(CompileError::UnknownClauseKind(cs.kind)),
        };
        Ok(Self { kind, boolean: cs.boolean, negate: cs.not, options: cs.options })
    }
}

impl TryFrom<OrderSerde> for OrderSpec {
    type Error = CompileError;
    fn try_from(os: OrderSerde) -> Result<Self, Self::Error> {
        let direction = match os.direction {
            None | Some(Value::Null) => Direction::Asc,
            Some(Value::String(s)) => s.parse::<Direction>()?,
            Some(Value::Number(n)) => Direction::from_sign(n.as_i64().unwrap_or(1)),
            Some(other) => {
                return Err(CompileError::InvalidOption {
                    option: "direction".into(),
                    value: other.to_string(),
                    valid: "asc, desc".into(),
                });
            }
        };
        let kind = os.options.get("type").and_then(Value::as_str).unwrap_or("basic").to_string();
        Ok(Self { column: os.column, direction, kind, options: os.options })
    }
}

impl TryFrom<AggregationSerde> for AggregationSpec {
    type Error = CompileError;
    fn try_from(a: AggregationSerde) -> Result<Self, Self::Error> {
        let kind = AggregationKind::from_name(&a.kind);
        let args = match (&kind, a.query) {
            (_, Some(q)) => AggregationArgs::Query(Box::new(QueryRequest::try_from(*q)?)),
            (AggregationKind::Filter, None) => AggregationArgs::Query(Box::default()),
            (_, None) => AggregationArgs::Value(a.args),
        };
        let sub_aggregations =
            a.aggregations.into_iter().map(Self::try_from).collect::<Result<_, _>>()?;
        Ok(Self { key: a.key, kind, args, sub_aggregations })
    }
}

/// # Errors
/// Returns an error if the JSON cannot be parsed or describes an invalid query.
pub fn parse_query_json(json: &str) -> Result<QueryRequest, SearchError> {
    let qs: QueryRequestSerde = serde_json::from_str(json)?;
    Ok(QueryRequest::try_from(qs)?)
}

/// # Errors
/// Returns an error if the value does not describe a valid query.
pub fn parse_query_value(value: Value) -> Result<QueryRequest, SearchError> {
    let qs: QueryRequestSerde = serde_json::from_value(value)?;
    Ok(QueryRequest::try_from(qs)?)
}
