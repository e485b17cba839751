//! Key-union merge used by the `and` path of clause composition.
//!
//! Accepted shapes, for a key present on both sides:
//! - object + object: merged recursively with these same rules;
//! - array + array: concatenated, left then right (two `must` lists become one);
//! - array + scalar/object: the right value is appended to the left array;
//! - scalar/object + array: the left value is prepended to the right array;
//! - anything else: both values are wrapped, in order, as a two-element array.
//!
//! Keys only on the right are appended in their original order. Array elements are never
//! merged with each other.

use serde_json::{Map, Value};

pub fn merge_into(acc: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match acc.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                acc.insert(key, value);
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(left), Value::Object(right)) => merge_into(left, right),
        (Value::Array(left), Value::Array(right)) => left.extend(right),
        (Value::Array(left), right) => left.push(right),
        (slot, Value::Array(mut right)) => {
            right.insert(0, slot.take());
            *slot = Value::Array(right);
        }
        (slot, right) => {
            let left = slot.take();
            *slot = Value::Array(vec![left, right]);
        }
    }
}
