use regex::Regex;
use std::sync::LazyLock;

use crate::errors::CompileError;

static ENGINE_DURATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(d|h|m|s|ms|micros|nanos)$").ok());

/// Validate an engine time value such as `10m` or `30s`.
///
/// # Errors
/// Returns `CompileError::InvalidOption` naming `option` when the value does not parse.
pub fn validate(option: &str, value: &str) -> Result<(), CompileError> {
    if ENGINE_DURATION.as_ref().is_some_and(|re| re.is_match(value)) {
        Ok(())
    } else {
        Err(CompileError::InvalidOption {
            option: option.to_string(),
            value: value.to_string(),
            valid: "<number><d|h|m|s|ms|micros|nanos>".into(),
        })
    }
}
