use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::errors::CompileError;
use crate::types::IndexName;

/// Free-form per-clause options (`boost`, `inner_hits`, plus kind-specific keys).
pub type Options = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boolean {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Exists,
}

impl Operator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Exists => "exists",
        }
    }

    /// Key used inside a `range` node, for the four ordering operators.
    #[must_use]
    pub fn range_key(self) -> Option<&'static str> {
        match self {
            Self::Gt => Some("gt"),
            Self::Gte => Some("gte"),
            Self::Lt => Some("lt"),
            Self::Lte => Some("lte"),
            _ => None,
        }
    }
}

impl FromStr for Operator {
    type Err = CompileError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "=" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            "exists" => Self::Exists,
            other => return Err(CompileError::UnknownOperator(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClauseKind {
    Basic { column: String, operator: Operator, value: Value },
    In { column: String, values: Vec<Value> },
    NotIn { column: String, values: Vec<Value> },
    Between { column: String, low: Value, high: Value },
    Null { column: String },
    NotNull { column: String },
    /// `=` compiles as a one-point `Between`, anything else as `Basic`.
    Date { column: String, operator: Operator, value: Value },
    Nested { query: Box<QueryRequest> },
    Not { query: Box<QueryRequest> },
    Prefix { column: String, value: Value },
    Script { script: String },
    Search { query: String },
    GeoDistance { column: String, location: Value, distance: String },
    GeoBoundsIn { column: String, bounds: Value },
    ParentId { relation_type: String, id: Value },
    Parent { document_type: String, query: Box<QueryRequest> },
    Child { document_type: String, query: Box<QueryRequest> },
    NestedDoc { column: String, query: Box<QueryRequest>, operator: Operator },
    /// The clause options are the function parameters.
    FunctionScore { function_type: String },
    QueryString { value: Value },
    Wildcard { column: String, value: Value },
    Regexp { column: String, value: Value },
}

impl ClauseKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "Basic",
            Self::In { .. } => "In",
            Self::NotIn { .. } => "NotIn",
            Self::Between { .. } => "Between",
            Self::Null { .. } => "Null",
            Self::NotNull { .. } => "NotNull",
            Self::Date { .. } => "Date",
            Self::Nested { .. } => "Nested",
            Self::Not { .. } => "Not",
            Self::Prefix { .. } => "Prefix",
            Self::Script { .. } => "Script",
            Self::Search { .. } => "Search",
            Self::GeoDistance { .. } => "GeoDistance",
            Self::GeoBoundsIn { .. } => "GeoBoundsIn",
            Self::ParentId { .. } => "ParentId",
            Self::Parent { .. } => "Parent",
            Self::Child { .. } => "Child",
            Self::NestedDoc { .. } => "NestedDoc",
            Self::FunctionScore { .. } => "FunctionScore",
            Self::QueryString { .. } => "QueryString",
            Self::Wildcard { .. } => "Wildcard",
            Self::Regexp { .. } => "Regexp",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub boolean: Boolean,
    pub negate: bool,
    pub options: Options,
}

impl Clause {
    #[must_use]
    pub fn new(kind: ClauseKind) -> Self {
        Self { kind, boolean: Boolean::And, negate: false, options: Options::new() }
    }

    #[must_use]
    pub fn boolean(mut self, boolean: Boolean) -> Self {
        self.boolean = boolean;
        self
    }

    #[must_use]
    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn is_or(&self) -> bool {
        self.boolean == Boolean::Or
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// 1 is ascending, anything else descending.
    #[must_use]
    pub fn from_sign(sign: i64) -> Self {
        if sign == 1 { Self::Asc } else { Self::Desc }
    }

    #[must_use]
    pub fn sign(self) -> i64 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for Direction {
    type Err = CompileError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "1" => Ok(Self::Asc),
            "desc" | "-1" => Ok(Self::Desc),
            _ => Err(CompileError::InvalidOption {
                option: "direction".into(),
                value: s.to_string(),
                valid: "asc, desc".into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub column: String,
    pub direction: Direction,
    /// `basic` for a field sort; otherwise the engine sort type without its leading underscore.
    pub kind: String,
    pub options: Options,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    False,
    True,
    WaitFor,
}

impl Refresh {
    pub const VALID: &'static str = "false, true, wait_for";

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::False => "false",
            Self::True => "true",
            Self::WaitFor => "wait_for",
        }
    }
}

impl FromStr for Refresh {
    type Err = CompileError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "false" => Ok(Self::False),
            "true" => Ok(Self::True),
            "wait_for" => Ok(Self::WaitFor),
            _ => Err(CompileError::InvalidOption {
                option: "refresh".into(),
                value: s.to_string(),
                valid: Self::VALID.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflicts {
    Abort,
    Proceed,
}

impl Conflicts {
    pub const VALID: &'static str = "abort, proceed";

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Proceed => "proceed",
        }
    }
}

impl FromStr for Conflicts {
    type Err = CompileError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "proceed" => Ok(Self::Proceed),
            _ => Err(CompileError::InvalidOption {
                option: "conflicts".into(),
                value: s.to_string(),
                valid: Self::VALID.into(),
            }),
        }
    }
}

/// Write options merged at the top level of write and delete requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub refresh: Option<Refresh>,
    pub conflicts: Option<Conflicts>,
}

impl OutputOptions {
    #[must_use]
    pub fn to_map(&self) -> Options {
        let mut out = Options::new();
        if let Some(r) = self.refresh {
            out.insert("refresh".into(), Value::String(r.as_str().into()));
        }
        if let Some(c) = self.conflicts {
            out.insert("conflicts".into(), Value::String(c.as_str().into()));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Sum,
    Avg,
    Min,
    Max,
    Stats,
    ExtendedStats,
    ValueCount,
}

impl MetricKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Stats => "stats",
            Self::ExtendedStats => "extended_stats",
            Self::ValueCount => "value_count",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    Terms,
    Filter,
    Nested,
    Cardinality,
    DateHistogram,
    DateRange,
    Exists,
    Metric(MetricKind),
    Children,
    /// Anything else; compiled as `{snake_case(name): args}`.
    Custom(String),
}

impl AggregationKind {
    /// Resolve a kind name (`terms`, `dateHistogram`, `date_histogram`, ...). Never fails:
    /// unrecognised names become `Custom`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match crate::utils::json::snake_case(name).as_str() {
            "terms" => Self::Terms,
            "filter" => Self::Filter,
            "nested" => Self::Nested,
            "cardinality" => Self::Cardinality,
            "date_histogram" => Self::DateHistogram,
            "date_range" => Self::DateRange,
            "exists" => Self::Exists,
            "children" => Self::Children,
            "sum" => Self::Metric(MetricKind::Sum),
            "avg" => Self::Metric(MetricKind::Avg),
            "min" => Self::Metric(MetricKind::Min),
            "max" => Self::Metric(MetricKind::Max),
            "stats" => Self::Metric(MetricKind::Stats),
            "extended_stats" => Self::Metric(MetricKind::ExtendedStats),
            "value_count" => Self::Metric(MetricKind::ValueCount),
            _ => Self::Custom(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationArgs {
    /// A bare field name, an argument map, or any passthrough value.
    Value(Value),
    /// Sub-query for `filter` aggregations.
    Query(Box<QueryRequest>),
}

impl AggregationArgs {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Value(Value::String(name.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSpec {
    pub key: String,
    pub kind: AggregationKind,
    pub args: AggregationArgs,
    pub sub_aggregations: Vec<AggregationSpec>,
}

impl AggregationSpec {
    #[must_use]
    pub fn new(key: impl Into<String>, kind: AggregationKind, args: AggregationArgs) -> Self {
        Self { key: key.into(), kind, args, sub_aggregations: Vec::new() }
    }

    #[must_use]
    pub fn with_sub(mut self, sub: AggregationSpec) -> Self {
        self.sub_aggregations.push(sub);
        self
    }
}

/// The accumulated description of one query. Built by the authoring methods in
/// `builder.rs` (or parsed from JSON) and consumed read-only by the compilers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub index: IndexName,
    pub columns: Option<Vec<String>>,
    pub primary: Vec<Clause>,
    pub filter: Vec<Clause>,
    pub post_filter: Vec<Clause>,
    pub orders: Vec<OrderSpec>,
    pub aggregations: Vec<AggregationSpec>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub routing: Option<String>,
    pub parent_id: Option<String>,
    pub track_total_hits: bool,
    pub search_after: Option<Vec<Value>>,
    pub scroll_time: Option<String>,
    pub scroll_id: Option<String>,
    pub include_inner_hits: bool,
    pub output: OutputOptions,
}

impl QueryRequest {
    #[must_use]
    pub fn has_clauses(&self) -> bool {
        !(self.primary.is_empty() && self.filter.is_empty() && self.post_filter.is_empty())
    }
}
