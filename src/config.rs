use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::SearchError;

pub const CONFIG_FILE_NAME: &str = "nexus-query.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Appended to every index name.
    pub index_suffix: String,
    /// Sent as `client.timeout` on every request when set.
    pub request_timeout_secs: Option<u64>,
    /// Scroll keep-alive for cursors and chunking.
    pub scroll_time: String,
    pub cursor_chunk_size: u64,
    pub slow_query_ms: u64,
    pub query_log_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_suffix: String::new(),
            request_timeout_secs: None,
            scroll_time: "10m".into(),
            cursor_chunk_size: 100,
            slow_query_ms: 500,
            query_log_path: None,
            log_dir: None,
            log_level: "info".into(),
        }
    }
}

impl SearchConfig {
    /// Candidate config files, highest precedence first: explicit path, `NEXUS_QUERY_CONFIG`,
    /// the user config dir, then the working directory.
    #[must_use]
    pub fn config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = vec![];
        if let Some(p) = explicit {
            paths.push(p.to_path_buf());
        }
        if let Ok(p) = std::env::var("NEXUS_QUERY_CONFIG") {
            paths.push(PathBuf::from(p));
        }
        if let Some(dir) = dirs_next::config_dir() {
            paths.push(dir.join(CONFIG_FILE_NAME));
        }
        if let Ok(cur) = std::env::current_dir() {
            paths.push(cur.join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Load the first config file found, then apply environment overrides.
    ///
    /// # Errors
    /// Unreadable or malformed files, and invalid values.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SearchError> {
        let mut cfg = match Self::config_paths(explicit).into_iter().find(|p| p.exists()) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Unreadable or malformed files, and invalid values.
    pub fn from_file(path: &Path) -> Result<Self, SearchError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Io(format!("{}: {e}", path.display())))?;
        let cfg = Self::from_toml(&text)?;
        log::info!("loaded search config from {}", path.display());
        Ok(cfg)
    }

    /// # Errors
    /// Malformed TOML or invalid values.
    pub fn from_toml(text: &str) -> Result<Self, SearchError> {
        let cfg: Self = toml::from_str(text).map_err(|e| SearchError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(s) = std::env::var("NEXUS_QUERY_INDEX_SUFFIX") {
            self.index_suffix = s;
        }
        if let Ok(s) = std::env::var("NEXUS_QUERY_REQUEST_TIMEOUT") {
            match s.parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => log::warn!("ignoring NEXUS_QUERY_REQUEST_TIMEOUT={s}: not a number"),
            }
        }
        if let Ok(s) = std::env::var("NEXUS_QUERY_SCROLL_TIME") {
            self.scroll_time = s;
        }
    }

    /// # Errors
    /// An invalid scroll keep-alive or a zero cursor chunk size.
    pub fn validate(&self) -> Result<(), SearchError> {
        crate::utils::duration::validate("scroll", &self.scroll_time)?;
        if self.cursor_chunk_size == 0 {
            return Err(SearchError::Config("cursor_chunk_size must be positive".into()));
        }
        Ok(())
    }

    /// Push the slow-query threshold and query log path into the process telemetry.
    pub fn apply_telemetry(&self) {
        crate::query::telemetry::set_slow_query_ms(self.slow_query_ms);
        match &self.query_log_path {
            Some(path) => crate::query::telemetry::set_query_log(path.clone(), None),
            None => crate::query::telemetry::clear_query_log(),
        }
    }

    /// # Errors
    /// Returns an error if the log directory or appenders cannot be created.
    pub fn init_logging(&self) -> Result<(), SearchError> {
        crate::logger::configure_logging(self.log_dir.as_deref(), Some(self.log_level.as_str()), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = SearchConfig::from_toml("index_suffix = \"_dev\"\nrequest_timeout_secs = 30\n").unwrap();
        assert_eq!(cfg.index_suffix, "_dev");
        assert_eq!(cfg.request_timeout_secs, Some(30));
        assert_eq!(cfg.scroll_time, "10m");
        assert_eq!(cfg.cursor_chunk_size, 100);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SearchConfig::from_toml("scroll_time = \"forever\"").is_err());
        assert!(SearchConfig::from_toml("cursor_chunk_size = 0").is_err());
        assert!(SearchConfig::from_toml("index_suffix = [").is_err());
    }

    #[test]
    fn explicit_path_comes_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "slow_query_ms = 50\n").unwrap();
        let paths = SearchConfig::config_paths(Some(path.as_path()));
        assert_eq!(paths[0], path);
        assert_eq!(SearchConfig::from_file(&path).unwrap().slow_query_ms, 50);
    }
}
