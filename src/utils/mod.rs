//! Utility modules: JSON helpers, developer trace lines, duration validation.
pub mod devlog;
pub mod duration;
pub mod json;
