use nexus_query::CompileError;
use nexus_query::query::{
    Boolean, Clause, ClauseKind, Direction, Operator, Options, QueryCompiler, QueryRequest,
};
use serde_json::{Value, json};

fn compile_query(request: &QueryRequest) -> Value {
    let compiled = QueryCompiler::default().compile_wheres(request).unwrap();
    Value::Object(compiled.query)
}

fn opts(v: Value) -> Options {
    match v {
        Value::Object(m) => m,
        _ => Options::new(),
    }
}

#[test]
fn and_chain_merges_into_one_must_list() {
    let q = QueryRequest::new("posts")
        .where_eq("a", 1)
        .where_eq("b", 2)
        .where_eq("c", 3)
        .where_eq("d", 4);
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"must": [
            {"term": {"a": 1}}, {"term": {"b": 2}}, {"term": {"c": 3}}, {"term": {"d": 4}}
        ]}})
    );
}

#[test]
fn first_or_demotes_accumulated_must() {
    let q = QueryRequest::new("posts").where_eq("status", "open").or_where_eq("is_featured", true);
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"should": [
            {"bool": {"must": [{"term": {"status": "open"}}]}},
            {"term": {"is_featured": true}}
        ]}})
    );
}

#[test]
fn and_after_or_is_wrapped_into_should() {
    let q = QueryRequest::new("posts")
        .where_eq("a", 1)
        .or_where_eq("b", 2)
        .where_eq("c", 3)
        .or_where_eq("d", 4);
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"should": [
            {"bool": {"must": [{"term": {"a": 1}}]}},
            {"term": {"b": 2}},
            {"bool": {"must": [{"term": {"c": 3}}]}},
            {"term": {"d": 4}}
        ]}})
    );
}

#[test]
fn leading_or_starts_from_empty_should() {
    let q = QueryRequest::new("posts").or_where_eq("a", 1);
    assert_eq!(compile_query(&q), json!({"bool": {"should": [{"term": {"a": 1}}]}}));
}

#[test]
fn not_in_is_must_not_terms() {
    for values in [vec![json!("x")], vec![json!(1), json!(2), json!(3)]] {
        let clause = Clause::new(ClauseKind::NotIn { column: "tag".into(), values: values.clone() });
        let compiled = QueryCompiler::default().compile_clause(&clause).unwrap();
        assert_eq!(compiled, json!({"bool": {"must_not": [{"terms": {"tag": values}}]}}));
    }
}

// Negated Between is the union of two closed half-ranges that both include the bounds,
// not the complement of [low, high]. Pinned as-is.
#[test]
fn negated_between_keeps_inclusive_half_ranges() {
    let q = QueryRequest::new("products").where_between("price", 10, 20, Boolean::And, true);
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"must": [{"bool": {"should": [
            {"range": {"price": {"lte": 10}}},
            {"range": {"price": {"gte": 20}}}
        ]}}]}})
    );
}

#[test]
fn unknown_operator_fails_to_parse() {
    for op in ["~=", "=>"] {
        assert_eq!(
            op.parse::<Operator>().unwrap_err(),
            CompileError::UnknownOperator(op.to_string())
        );
    }
    assert_eq!("!=".parse::<Operator>().unwrap(), Operator::Ne);
    assert_eq!("<>".parse::<Operator>().unwrap(), Operator::Ne);
}

#[test]
fn nested_group_takes_first_non_empty_part() {
    let filter_only = QueryRequest::default().filter_where(|q| q.where_eq("a", 1));
    let q = QueryRequest::new("posts")
        .push_clause(Clause::new(ClauseKind::Nested { query: Box::new(filter_only) }));
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"must": [{"bool": {"must": [{"term": {"a": 1}}]}}]}})
    );

    let post_only = QueryRequest::default().post_filter_where(|q| q.where_eq("b", 2));
    let q = QueryRequest::new("posts")
        .push_clause(Clause::new(ClauseKind::Nested { query: Box::new(post_only) }));
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"must": [{"bool": {"must": [{"term": {"b": 2}}]}}]}})
    );

    let both = QueryRequest::default()
        .where_eq("q", 1)
        .filter_where(|q| q.where_eq("f", 2));
    let q = QueryRequest::new("posts")
        .push_clause(Clause::new(ClauseKind::Nested { query: Box::new(both) }));
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"must": [{"bool": {"must": [{"term": {"q": 1}}]}}]}})
    );
}

#[test]
fn empty_nested_group_matches_all() {
    let q = QueryRequest::new("posts")
        .push_clause(Clause::new(ClauseKind::Nested { query: Box::new(QueryRequest::default()) }));
    assert_eq!(compile_query(&q), json!({"bool": {"must": [{"match_all": {}}]}}));
}

#[test]
fn select_body_layout() {
    let q = QueryRequest::new("posts")
        .select(["title", "status"])
        .where_eq("status", "open")
        .filter_where(|q| q.where_in("tag", ["rust"], Boolean::And))
        .post_filter_where(|q| q.where_eq("lang", "en"))
        .order_by("created_at", Direction::Desc, Options::new())
        .offset(20)
        .limit(10);
    let compiled = QueryCompiler::new("_test").compile_select(&q).unwrap();
    assert_eq!(compiled.index, "posts_test");
    assert_eq!(
        Value::Object(compiled.body),
        json!({
            "_source": ["title", "status"],
            "query": {"bool": {
                "must": [{"term": {"status": "open"}}],
                "filter": {"bool": {"must": [{"terms": {"tag": ["rust"]}}]}}
            }},
            "post_filter": {"bool": {"must": [{"term": {"lang": "en"}}]}},
            "sort": [{"created_at": {"order": "desc"}}],
            "from": 20,
            "size": 10
        })
    );
}

#[test]
fn star_selects_full_source_and_zero_offset_is_omitted() {
    let q = QueryRequest::new("posts").select(["*"]).offset(0);
    let body = QueryCompiler::default().compile_select(&q).unwrap().body;
    assert_eq!(body.get("_source"), Some(&json!(true)));
    assert!(!body.contains_key("from"));
    assert!(!body.contains_key("query"));
}

#[test]
fn scroll_parameters_sit_beside_the_body() {
    let q = QueryRequest::new("posts").scroll_time("1m").unwrap().scroll_id("abc");
    let v = QueryCompiler::default().compile_select(&q).unwrap().to_value();
    assert_eq!(v["scroll"], json!("1m"));
    assert_eq!(v["scroll_id"], json!("abc"));
    assert!(v["body"].get("scroll").is_none());
}

#[test]
fn delete_carries_write_options() {
    let q = QueryRequest::new("posts")
        .where_eq("status", "spam")
        .with_refresh("wait_for")
        .unwrap()
        .on_conflicts("proceed")
        .unwrap();
    let v = QueryCompiler::default().compile_delete(&q).unwrap().to_value();
    assert_eq!(v["refresh"], json!("wait_for"));
    assert_eq!(v["conflicts"], json!("proceed"));
    assert_eq!(v["body"]["query"], json!({"bool": {"must": [{"term": {"status": "spam"}}]}}));
}

#[test]
fn parent_with_both_contexts_is_rejected() {
    let q = QueryRequest::new("answers").where_parent(
        "question",
        |q| q.where_eq("a", 1).filter_where(|q| q.where_eq("b", 2)),
        Options::new(),
        Boolean::And,
    );
    let err = QueryCompiler::default().compile_wheres(&q).unwrap_err();
    assert!(err.to_string().contains("parent"), "{err}");
}

#[test]
fn child_and_nested_doc_shapes() {
    let q = QueryRequest::new("questions")
        .where_child("answer", |q| q.where_eq("accepted", true), Options::new(), Boolean::And)
        .where_nested_doc("comments", |q| q.where_eq("comments.author", "kim"), Boolean::And, false);
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"must": [
            {"has_child": {"type": "answer", "query": {"bool": {"must": [{"term": {"accepted": true}}]}}}},
            {"nested": {"path": "comments", "query": {"bool": {"must": [{"term": {"comments.author": "kim"}}]}}}}
        ]}})
    );
}

#[test]
fn search_over_weighted_fields() {
    let q = QueryRequest::new("posts").search(
        "rust async",
        opts(json!({"fields": {"title": 3, "body": 1}, "fuzziness": "AUTO"})),
        Boolean::And,
    );
    assert_eq!(
        compile_query(&q),
        json!({"bool": {"must": [{"multi_match": {
            "query": "rust async",
            "type": "most_fields",
            "fields": ["title^3", "body^1"],
            "fuzziness": "AUTO"
        }}]}})
    );
}

#[test]
fn single_document_write() {
    let mut doc = serde_json::Map::new();
    doc.insert("id".into(), json!("7"));
    doc.insert("title".into(), json!("hello"));
    doc.insert("_routing".into(), json!("user-1"));
    doc.insert("_sort".into(), json!([1]));
    let q = QueryRequest::new("posts").routing("ignored").with_refresh("true").unwrap();
    let v = QueryCompiler::default().compile_index(&q, doc).to_value();
    assert_eq!(
        v,
        json!({
            "index": "posts",
            "body": {"id": "7", "title": "hello"},
            "id": "7",
            "routing": "user-1",
            "refresh": "true"
        })
    );
}
