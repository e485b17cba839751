//! Authoring methods on `QueryRequest`.
//!
//! Each `where_*` method appends one clause to the primary list. `filter_where` and
//! `post_filter_where` run an authoring call and move the clause it added into the filter
//! or post-filter list instead.

use serde_json::{Value, json};

use super::types::{
    AggregationArgs, AggregationKind, AggregationSpec, Boolean, Clause, ClauseKind, Conflicts,
    Direction, Operator, Options, OrderSpec, QueryRequest, Refresh,
};
use crate::errors::CompileError;

/// Date component compared by `where_date_part`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Weekday,
}

impl DatePart {
    fn script_accessor(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "monthOfYear",
            Self::Day => "dayOfMonth",
            Self::Weekday => "dayOfWeek",
        }
    }
}

impl QueryRequest {
    #[must_use]
    pub fn new(index: impl Into<String>) -> Self {
        Self { index: index.into(), ..Self::default() }
    }

    /// Retarget the request at another index, keeping its clauses.
    #[must_use]
    pub fn from_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    #[must_use]
    pub fn parent_id(mut self, id: impl Into<String>) -> Self {
        self.parent_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = track;
        self
    }

    #[must_use]
    pub fn search_after(mut self, cursor: Vec<Value>) -> Self {
        self.search_after = Some(cursor);
        self
    }

    /// # Errors
    /// Fails when `time` is not an engine duration such as `10m`.
    pub fn scroll_time(mut self, time: &str) -> Result<Self, CompileError> {
        crate::utils::duration::validate("scroll", time)?;
        self.scroll_time = Some(time.to_string());
        Ok(self)
    }

    #[must_use]
    pub fn scroll_id(mut self, id: impl Into<String>) -> Self {
        self.scroll_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_inner_hits(mut self) -> Self {
        self.include_inner_hits = true;
        self
    }

    /// # Errors
    /// Fails unless `value` is one of `false`, `true`, `wait_for`.
    pub fn with_refresh(mut self, value: &str) -> Result<Self, CompileError> {
        self.output.refresh = Some(value.parse::<Refresh>()?);
        Ok(self)
    }

    /// # Errors
    /// Fails unless `value` is one of `abort`, `proceed`.
    pub fn on_conflicts(mut self, value: &str) -> Result<Self, CompileError> {
        self.output.conflicts = Some(value.parse::<Conflicts>()?);
        Ok(self)
    }

    #[must_use]
    pub fn push_clause(mut self, clause: Clause) -> Self {
        self.primary.push(clause);
        self
    }

    /// Attach options to the most recently added primary clause.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        if let Some(last) = self.primary.last_mut() {
            last.options = options;
        }
        self
    }

    #[must_use]
    pub fn filter_where(self, add: impl FnOnce(Self) -> Self) -> Self {
        self.move_last_added(add, false)
    }

    #[must_use]
    pub fn post_filter_where(self, add: impl FnOnce(Self) -> Self) -> Self {
        self.move_last_added(add, true)
    }

    fn move_last_added(self, add: impl FnOnce(Self) -> Self, post: bool) -> Self {
        let before = self.primary.len();
        let mut out = add(self);
        if out.primary.len() > before
            && let Some(clause) = out.primary.pop()
        {
            if post {
                out.post_filter.push(clause);
            } else {
                out.filter.push(clause);
            }
        }
        out
    }

    /// A null `value` turns `=` into `Null` and `!=` into `NotNull`.
    #[must_use]
    pub fn where_basic(
        self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
        boolean: Boolean,
    ) -> Self {
        let column = column.into();
        let value = value.into();
        let kind = match (&value, operator) {
            (Value::Null, Operator::Eq) => ClauseKind::Null { column },
            (Value::Null, Operator::Ne) => ClauseKind::NotNull { column },
            _ => ClauseKind::Basic { column, operator, value },
        };
        self.push_clause(Clause::new(kind).boolean(boolean))
    }

    #[must_use]
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_basic(column, Operator::Eq, value, Boolean::And)
    }

    #[must_use]
    pub fn or_where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_basic(column, Operator::Eq, value, Boolean::Or)
    }

    #[must_use]
    pub fn where_in<I, V>(self, column: impl Into<String>, values: I, boolean: Boolean) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_clause(Clause::new(ClauseKind::In { column: column.into(), values }).boolean(boolean))
    }

    #[must_use]
    pub fn where_not_in<I, V>(self, column: impl Into<String>, values: I, boolean: Boolean) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_clause(
            Clause::new(ClauseKind::NotIn { column: column.into(), values }).boolean(boolean),
        )
    }

    #[must_use]
    pub fn where_between(
        self,
        column: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
        boolean: Boolean,
        not: bool,
    ) -> Self {
        let kind = ClauseKind::Between { column: column.into(), low: low.into(), high: high.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).negated(not))
    }

    #[must_use]
    pub fn where_null(self, column: impl Into<String>, boolean: Boolean) -> Self {
        self.push_clause(Clause::new(ClauseKind::Null { column: column.into() }).boolean(boolean))
    }

    #[must_use]
    pub fn where_not_null(self, column: impl Into<String>, boolean: Boolean) -> Self {
        self.push_clause(Clause::new(ClauseKind::NotNull { column: column.into() }).boolean(boolean))
    }

    #[must_use]
    pub fn where_date(
        self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
        boolean: Boolean,
        not: bool,
    ) -> Self {
        let kind = ClauseKind::Date { column: column.into(), operator, value: value.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).negated(not))
    }

    /// Compare one component of a date field through a script clause.
    #[must_use]
    pub fn where_date_part(
        self,
        part: DatePart,
        column: &str,
        operator: Operator,
        value: i64,
        boolean: Boolean,
    ) -> Self {
        let op = if operator == Operator::Eq { "==" } else { operator.as_str() };
        let script = format!(
            "doc.{column}.size() > 0 && doc.{column}.date.{} {op} params.value",
            part.script_accessor()
        );
        let mut options = Options::new();
        options.insert("params".into(), json!({ "value": value }));
        self.where_script(script, options, boolean)
    }

    #[must_use]
    pub fn where_geo_distance(
        self,
        column: impl Into<String>,
        location: Value,
        distance: impl Into<String>,
        boolean: Boolean,
        not: bool,
    ) -> Self {
        let kind = ClauseKind::GeoDistance { column: column.into(), location, distance: distance.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).negated(not))
    }

    #[must_use]
    pub fn where_geo_bounds_in(self, column: impl Into<String>, bounds: Value) -> Self {
        self.push_clause(Clause::new(ClauseKind::GeoBoundsIn { column: column.into(), bounds }))
    }

    /// Group the clauses built by `build` into one nested clause. The group lands in the
    /// primary list when the sub-query has primary clauses, and in the filter list when it
    /// has filter clauses.
    #[must_use]
    pub fn where_nested(mut self, build: impl FnOnce(Self) -> Self, boolean: Boolean) -> Self {
        let sub = build(Self::default());
        let to_primary = !sub.primary.is_empty();
        let to_filter = !sub.filter.is_empty();
        let clause = Clause::new(ClauseKind::Nested { query: Box::new(sub) }).boolean(boolean);
        if to_filter {
            self.filter.push(clause.clone());
        }
        if to_primary {
            self.primary.push(clause);
        }
        self
    }

    #[must_use]
    pub fn where_not(self, build: impl FnOnce(Self) -> Self, boolean: Boolean) -> Self {
        let sub = build(Self::default());
        self.push_clause(Clause::new(ClauseKind::Not { query: Box::new(sub) }).boolean(boolean))
    }

    #[must_use]
    pub fn where_starts_with(
        self,
        column: impl Into<String>,
        value: impl Into<Value>,
        boolean: Boolean,
        not: bool,
    ) -> Self {
        let kind = ClauseKind::Prefix { column: column.into(), value: value.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).negated(not))
    }

    #[must_use]
    pub fn where_script(self, script: impl Into<String>, options: Options, boolean: Boolean) -> Self {
        let kind = ClauseKind::Script { script: script.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).options(options))
    }

    /// Full-text search. Recognised options: `fields` (list, or map of field to boost),
    /// `matchType`, `fuzziness`, `constant_score`.
    #[must_use]
    pub fn search(self, query: impl Into<String>, options: Options, boolean: Boolean) -> Self {
        let kind = ClauseKind::Search { query: query.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).options(options))
    }

    #[must_use]
    pub fn where_parent_id(
        self,
        relation_type: impl Into<String>,
        id: impl Into<Value>,
        boolean: Boolean,
    ) -> Self {
        let kind = ClauseKind::ParentId { relation_type: relation_type.into(), id: id.into() };
        self.push_clause(Clause::new(kind).boolean(boolean))
    }

    #[must_use]
    pub fn where_parent(
        self,
        document_type: impl Into<String>,
        build: impl FnOnce(Self) -> Self,
        options: Options,
        boolean: Boolean,
    ) -> Self {
        let query = Box::new(build(Self::default()));
        let kind = ClauseKind::Parent { document_type: document_type.into(), query };
        self.push_clause(Clause::new(kind).boolean(boolean).options(options))
    }

    #[must_use]
    pub fn where_child(
        self,
        document_type: impl Into<String>,
        build: impl FnOnce(Self) -> Self,
        options: Options,
        boolean: Boolean,
    ) -> Self {
        let query = Box::new(build(Self::default()));
        let kind = ClauseKind::Child { document_type: document_type.into(), query };
        self.push_clause(Clause::new(kind).boolean(boolean).options(options))
    }

    #[must_use]
    pub fn where_nested_doc(
        self,
        column: impl Into<String>,
        build: impl FnOnce(Self) -> Self,
        boolean: Boolean,
        not: bool,
    ) -> Self {
        let operator = if not { Operator::Ne } else { Operator::Eq };
        let query = Box::new(build(Self::default()));
        let kind = ClauseKind::NestedDoc { column: column.into(), query, operator };
        self.push_clause(Clause::new(kind).boolean(boolean))
    }

    #[must_use]
    pub fn where_function_score(
        self,
        function_type: impl Into<String>,
        params: Options,
        boolean: Boolean,
    ) -> Self {
        let kind = ClauseKind::FunctionScore { function_type: function_type.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).options(params))
    }

    #[must_use]
    pub fn where_query_string(self, value: impl Into<Value>, options: Options, boolean: Boolean) -> Self {
        let kind = ClauseKind::QueryString { value: value.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).options(options))
    }

    #[must_use]
    pub fn where_wildcard(
        self,
        column: impl Into<String>,
        value: impl Into<Value>,
        options: Options,
        boolean: Boolean,
    ) -> Self {
        let kind = ClauseKind::Wildcard { column: column.into(), value: value.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).options(options))
    }

    #[must_use]
    pub fn where_regexp(
        self,
        column: impl Into<String>,
        value: impl Into<Value>,
        options: Options,
        boolean: Boolean,
    ) -> Self {
        let kind = ClauseKind::Regexp { column: column.into(), value: value.into() };
        self.push_clause(Clause::new(kind).boolean(boolean).options(options))
    }

    #[must_use]
    pub fn aggregation(mut self, spec: AggregationSpec) -> Self {
        self.aggregations.push(spec);
        self
    }

    /// Shorthand for a field-based aggregation by kind name.
    #[must_use]
    pub fn aggregate(self, key: impl Into<String>, kind: &str, args: impl Into<Value>) -> Self {
        let spec = AggregationSpec::new(
            key,
            AggregationKind::from_name(kind),
            AggregationArgs::Value(args.into()),
        );
        self.aggregation(spec)
    }

    /// `options.type` selects the sort kind (`basic` when absent).
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction, options: Options) -> Self {
        let kind = options
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("basic")
            .to_string();
        self.orders.push(OrderSpec { column: column.into(), direction, kind, options });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_comparisons_become_null_clauses() {
        let q = QueryRequest::new("posts")
            .where_basic("deleted_at", Operator::Eq, Value::Null, Boolean::And)
            .where_basic("title", Operator::Ne, Value::Null, Boolean::Or);
        assert_eq!(q.primary[0].kind, ClauseKind::Null { column: "deleted_at".into() });
        assert_eq!(q.primary[1].kind, ClauseKind::NotNull { column: "title".into() });
        assert!(q.primary[1].is_or());
    }

    #[test]
    fn filter_where_moves_the_added_clause() {
        let q = QueryRequest::new("posts")
            .where_eq("status", "open")
            .filter_where(|q| q.where_in("tag", ["a", "b"], Boolean::And))
            .post_filter_where(|q| q.where_eq("lang", "en"));
        assert_eq!(q.primary.len(), 1);
        assert_eq!(q.filter.len(), 1);
        assert_eq!(q.post_filter.len(), 1);
        assert_eq!(q.filter[0].kind.name(), "In");
    }

    #[test]
    fn nested_group_goes_where_its_clauses_are() {
        let q = QueryRequest::new("posts").where_nested(
            |q| q.where_eq("a", 1).filter_where(|q| q.where_eq("b", 2)),
            Boolean::And,
        );
        assert_eq!(q.primary.len(), 1);
        assert_eq!(q.filter.len(), 1);

        let empty = QueryRequest::new("posts").where_nested(|q| q, Boolean::And);
        assert!(!empty.has_clauses());
    }

    #[test]
    fn date_part_builds_script() {
        let q = QueryRequest::new("events").where_date_part(
            DatePart::Weekday,
            "starts_at",
            Operator::Eq,
            3,
            Boolean::And,
        );
        let clause = &q.primary[0];
        assert_eq!(
            clause.kind,
            ClauseKind::Script {
                script: "doc.starts_at.size() > 0 && doc.starts_at.date.dayOfWeek == params.value".into()
            }
        );
        assert_eq!(clause.options["params"], json!({"value": 3}));
    }

    #[test]
    fn invalid_write_options_are_rejected() {
        assert!(QueryRequest::new("x").with_refresh("sometimes").is_err());
        assert!(QueryRequest::new("x").on_conflicts("ignore").is_err());
        assert!(QueryRequest::new("x").scroll_time("forever").is_err());
        let ok = QueryRequest::new("x").with_refresh("wait_for").unwrap();
        assert_eq!(ok.output.refresh, Some(Refresh::WaitFor));
    }

    #[test]
    fn order_kind_comes_from_options() {
        let mut opts = Options::new();
        opts.insert("type".into(), json!("geo_distance"));
        let q = QueryRequest::new("x")
            .order_by("created_at", Direction::Desc, Options::new())
            .order_by("location", Direction::Asc, opts);
        assert_eq!(q.orders[0].kind, "basic");
        assert_eq!(q.orders[1].kind, "geo_distance");
    }
}
