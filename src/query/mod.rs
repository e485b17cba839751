// Telemetry is a submodule of query
pub mod telemetry;

// Submodules for separation of concerns
mod aggregation;
mod builder;
mod bulk;
mod compile;
mod cursor;
mod exec;
mod merge;
mod parse;
mod processor;
mod types;

// Public API re-exports
pub use builder::DatePart;
pub use bulk::{BulkMode, BulkRequest};
pub use compile::{CompiledClauses, CompiledRequest, QueryCompiler};
pub use cursor::{DocumentCursor, ScrollCursor, ScrollPage, ScrollState};
pub use exec::{Connection, Operation, Transport, TransportResult};
pub use merge::merge_into;
pub use parse::{
    AggregationSerde, ClauseSerde, OrderSerde, QueryRequestSerde, parse_query_json,
    parse_query_value,
};
pub use processor::{AggregationResult, SearchResults, document_from_hit, process};
pub use types::{
    AggregationArgs, AggregationKind, AggregationSpec, Boolean, Clause, ClauseKind, Conflicts,
    Direction, MetricKind, Operator, Options, OrderSpec, OutputOptions, QueryRequest, Refresh,
};
