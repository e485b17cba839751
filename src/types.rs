use serde_json::{Map, Value};

pub type IndexName = String;

/// A flat document: the `_source` of a hit, or a body to be written. Key order is preserved.
pub type Document = Map<String, Value>;
