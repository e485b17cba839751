use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

use crate::errors::SearchError;

pub const METRICS_TARGET: &str = "nexus_query::metrics";

const ENCODER_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

fn rolling(dir: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, SearchError> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", dir.join(format!("{stem}.{{}}.log")).display()), keep)
        .map_err(|e| SearchError::Config(e.to_string()))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENCODER_PATTERN)))
        .build(dir.join(format!("{stem}.log")), Box::new(policy))
        .map_err(|e| SearchError::Io(e.to_string()))
}

fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Build the log4rs config: `{name}.log` for the application, `{name}_metrics.log` for the
/// metrics target, and optionally `{name}_dev6.log` for developer bench lines.
///
/// # Errors
/// Returns an error if the directory or an appender cannot be created.
pub fn build_config(
    dir: &Path,
    name: &str,
    level: LevelFilter,
    retention: u32,
    enable_dev6: bool,
) -> Result<Config, SearchError> {
    std::fs::create_dir_all(dir).map_err(|e| SearchError::Io(e.to_string()))?;
    let app = rolling(dir, name, retention)?;
    let metrics = rolling(dir, &format!("{name}_metrics"), retention)?;
    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(app)))
        .appender(Appender::builder().build("metrics", Box::new(metrics)))
        .logger(Logger::builder().appender("metrics").additive(false).build(METRICS_TARGET, level));

    if enable_dev6 {
        let dev6 = rolling(dir, &format!("{name}_dev6"), retention)?;
        builder = builder
            .appender(Appender::builder().build("dev6", Box::new(dev6)))
            .logger(
                Logger::builder()
                    .appender("dev6")
                    .additive(false)
                    .build(crate::utils::devlog::DEV_TARGET, LevelFilter::Trace),
            );
    } else {
        builder = builder.logger(
            Logger::builder().additive(false).build(crate::utils::devlog::DEV_TARGET, LevelFilter::Off),
        );
    }

    builder
        .build(Root::builder().appender("app").build(level))
        .map_err(|e| SearchError::Config(e.to_string()))
}

/// Initializes logging under `dir`, creating `{dir}/{name}.log` and `{dir}/{name}_metrics.log`.
///
/// # Errors
/// Returns an error if the directory cannot be created or the logger is already initialized.
pub fn init_for_dir(dir: &Path, name: &str) -> Result<(), SearchError> {
    let config = build_config(dir, name, LevelFilter::Info, 7, false)?;
    log4rs::init_config(config).map_err(|e| SearchError::Config(e.to_string()))?;
    Ok(())
}

/// Configure logging globally for the process. Ignored if a logger is already installed.
/// - dir: base directory for logs; if None, current directory.
/// - level: error|warn|info|debug|trace|off
/// - retention: number of rolled files to keep (default 7)
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be created.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<u32>,
) -> Result<(), SearchError> {
    configure_logging_with_dev(dir, level, retention, false)
}

/// As `configure_logging`, also routing `dev6!` lines to a `nexus_query_dev6.log` file when
/// `enable_dev6` is set.
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be created.
pub fn configure_logging_with_dev(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<u32>,
    enable_dev6: bool,
) -> Result<(), SearchError> {
    let base = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let config =
        build_config(&base, "nexus_query", parse_level(level), retention.unwrap_or(7), enable_dev6)?;
    if log4rs::init_config(config).is_err() {
        log::debug!("logger already initialized; keeping existing configuration");
    }
    Ok(())
}

/// Configure logging from environment variables if present:
/// - `NEXUS_QUERY_LOG_DIR`
/// - `NEXUS_QUERY_LOG_LEVEL`
/// - `NEXUS_QUERY_LOG_RETENTION`
/// - `NEXUS_QUERY_DEV6`
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be created.
pub fn configure_from_env() -> Result<(), SearchError> {
    let dir = std::env::var("NEXUS_QUERY_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("NEXUS_QUERY_LOG_LEVEL").ok();
    let retention =
        std::env::var("NEXUS_QUERY_LOG_RETENTION").ok().and_then(|s| s.parse::<u32>().ok());
    let dev6_enabled = std::env::var("NEXUS_QUERY_DEV6")
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    configure_logging_with_dev(dir.as_deref(), level.as_deref(), retention, dev6_enabled)
}
