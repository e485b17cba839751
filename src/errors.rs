use serde_json::Value;
use thiserror::Error;

/// Structural problems in a query model. Always fatal; compilation aborts on the first one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("Unknown clause kind: {0}")]
    UnknownClauseKind(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Cannot use both filter and query contexts within a {relation} relation context")]
    ConflictingRelationContext { relation: String },

    #[error("{value} is an invalid {option} option, valid options are: {valid}")]
    InvalidOption { option: String, value: String, valid: String },

    #[error("Missing field `{field}` in {context}")]
    MissingField { context: String, field: String },

    #[error("Invalid clause: {0}")]
    InvalidClause(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Query:: {request}, Bindings :: {bindings}, Result:: {result}")]
    Bulk { request: Box<Value>, bindings: Box<Value>, result: Box<Value> },

    #[error("{source}")]
    Transport {
        operation: String,
        request: Box<Value>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl SearchError {
    /// The compiled request that was in flight, for bulk and transport failures.
    #[must_use]
    pub fn request(&self) -> Option<&Value> {
        match self {
            Self::Bulk { request, .. } | Self::Transport { request, .. } => Some(request),
            _ => None,
        }
    }
}
