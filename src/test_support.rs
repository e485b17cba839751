#![cfg(test)]

// Tiny test-only helpers
use serde_json::Value;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::Document;

/// Create a unique temp file path with the given stem and extension in the OS temp dir.
pub fn temp_path(stem: &str, ext: &str) -> PathBuf {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("{stem}_{now}.{ext}"));
    p
}

/// A document from a JSON object literal; anything else gives an empty document.
pub fn doc(v: Value) -> Document {
    match v {
        Value::Object(m) => m,
        _ => Document::new(),
    }
}
