pub mod config;
pub mod errors;
pub mod logger;
pub mod query;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::SearchConfig;
pub use errors::{CompileError, SearchError};
pub use query::{
    Boolean, Connection, Direction, Operation, Operator, QueryCompiler, QueryRequest, Transport,
};

/// Load configuration, set up logging and telemetry, and return the config.
///
/// This should be called once before creating a `Connection`.
///
/// # Errors
/// Returns an error if the configuration is invalid or logging cannot be set up.
pub fn init(config_path: Option<&std::path::Path>) -> Result<SearchConfig, SearchError> {
    let cfg = SearchConfig::load(config_path)?;
    cfg.init_logging()?;
    cfg.apply_telemetry();
    log::info!("nexus-query initialized (index suffix {:?})", cfg.index_suffix);
    Ok(cfg)
}
