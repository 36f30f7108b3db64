//! Service configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Orchestrator configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `DATABASE_URL`: PostgreSQL saga store and inventory; in-memory when unset
/// - `REDIS_URL`: redis drop registry; in-memory when unset
/// - `SAGA_TIMEOUT_SECS`, `SAGA_SWEEP_INTERVAL_MS`, `SAGA_SWEEP_BATCH`
/// - `DROP_LIFETIME_SECS`, `DROP_EXPIRY_INTERVAL_MS`
/// - `RESERVATION_TTL_SECS`, `RESERVATION_SWEEP_INTERVAL_MS`
/// - `REACTOR_SCRIPT_DIR`: directory of reactor script JSON files
/// - `QUEST_DEFINITION_FILE`: JSON array of quest definitions
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub saga_timeout: Duration,
    pub saga_sweep_interval: Duration,
    pub saga_sweep_batch: i64,
    pub drop_lifetime: Duration,
    pub drop_expiry_interval: Duration,
    pub reservation_ttl: Duration,
    pub reservation_sweep_interval: Duration,
    pub reactor_script_dir: Option<PathBuf>,
    pub quest_definition_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: non_empty("DATABASE_URL"),
            redis_url: non_empty("REDIS_URL"),
            saga_timeout: parsed("SAGA_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.saga_timeout),
            saga_sweep_interval: parsed("SAGA_SWEEP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.saga_sweep_interval),
            saga_sweep_batch: parsed("SAGA_SWEEP_BATCH")
                .and_then(|b| i64::try_from(b).ok())
                .filter(|b| *b > 0)
                .unwrap_or(defaults.saga_sweep_batch),
            drop_lifetime: parsed("DROP_LIFETIME_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.drop_lifetime),
            drop_expiry_interval: parsed("DROP_EXPIRY_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.drop_expiry_interval),
            reservation_ttl: parsed("RESERVATION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.reservation_ttl),
            reservation_sweep_interval: parsed("RESERVATION_SWEEP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.reservation_sweep_interval),
            reactor_script_dir: non_empty("REACTOR_SCRIPT_DIR").map(PathBuf::from),
            quest_definition_file: non_empty("QUEST_DEFINITION_FILE").map(PathBuf::from),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            redis_url: None,
            saga_timeout: Duration::from_secs(300),
            saga_sweep_interval: Duration::from_millis(1000),
            saga_sweep_batch: 100,
            drop_lifetime: Duration::from_secs(180),
            drop_expiry_interval: Duration::from_millis(2000),
            reservation_ttl: Duration::from_secs(30),
            reservation_sweep_interval: Duration::from_millis(1000),
            reactor_script_dir: None,
            quest_definition_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.saga_timeout, Duration::from_secs(300));
        assert_eq!(config.saga_sweep_batch, 100);
        assert!(config.database_url.is_none());
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/sagas"),
            ("SAGA_TIMEOUT_SECS", "60"),
            ("SAGA_SWEEP_BATCH", "25"),
            ("DROP_EXPIRY_INTERVAL_MS", "500"),
            ("REACTOR_SCRIPT_DIR", "/etc/reactors"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/sagas"));
        assert_eq!(config.saga_timeout, Duration::from_secs(60));
        assert_eq!(config.saga_sweep_batch, 25);
        assert_eq!(config.drop_expiry_interval, Duration::from_millis(500));
        assert_eq!(config.reactor_script_dir, Some(PathBuf::from("/etc/reactors")));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "http"),
            ("SAGA_SWEEP_BATCH", "0"),
            ("DROP_LIFETIME_SECS", "-5"),
            ("REDIS_URL", "  "),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.saga_sweep_batch, 100);
        assert_eq!(config.drop_lifetime, Duration::from_secs(180));
        assert!(config.redis_url.is_none());
    }
}
