//! Small helpers over `serde_json::Value` shared by the compilers.

use serde_json::{Map, Value};

/// Loose truthiness used by clause options: null, false, zero, `""`, `"0"` and empty
/// containers are false; everything else is true.
#[must_use]
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Option lookup that treats falsy values as absent.
#[must_use]
pub fn non_empty<'a>(options: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    options.get(key).filter(|v| is_truthy(v))
}

/// Mutable access to the value under the first key of an object.
pub fn first_entry_mut(map: &mut Map<String, Value>) -> Option<(String, &mut Value)> {
    let key = map.keys().next()?.clone();
    map.get_mut(&key).map(|v| (key, v))
}

/// `{ key: value }`
#[must_use]
pub fn single(key: impl Into<String>, value: Value) -> Value {
    let mut m = Map::with_capacity(1);
    m.insert(key.into(), value);
    Value::Object(m)
}

#[must_use]
pub fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// `camelCase` / `StudlyCase` / `spaced words` to `snake_case`. Existing underscores are kept.
#[must_use]
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars().filter(|c| !c.is_whitespace()) {
        if ch.is_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_loose_rules() {
        for v in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!("0"), json!([]), json!({})] {
            assert!(!is_truthy(&v), "{v} should be falsy");
        }
        for v in [json!(true), json!(1), json!("AUTO"), json!([0]), json!({"a": 1})] {
            assert!(is_truthy(&v), "{v} should be truthy");
        }
    }

    #[test]
    fn snake_case_conversions() {
        assert_eq!(snake_case("topHits"), "top_hits");
        assert_eq!(snake_case("TopHits"), "top_hits");
        assert_eq!(snake_case("percentiles"), "percentiles");
        assert_eq!(snake_case("geo_bounds"), "geo_bounds");
        assert_eq!(snake_case("Weighted Avg"), "weighted_avg");
    }

    #[test]
    fn first_entry_is_insertion_order() {
        let mut m = Map::new();
        m.insert("term".into(), json!({"a": 1}));
        m.insert("boost".into(), json!(2));
        let (k, v) = first_entry_mut(&mut m).unwrap();
        assert_eq!(k, "term");
        assert_eq!(v, &json!({"a": 1}));
        assert!(first_entry_mut(&mut Map::new()).is_none());
    }
}
