//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::HoldPolicy;
use saga::CoreConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `HOLD_TTL_SECS`: how long a hold stays payable (default: `900`)
/// - `CALL_TIMEOUT_MS`: bound on each collaborator call (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub hold_ttl_secs: u64,
    pub call_timeout_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            hold_ttl_secs: parse_var("HOLD_TTL_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.hold_ttl_secs),
            call_timeout_ms: parse_var("CALL_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.call_timeout_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Policy handed to the reservation core.
    pub fn core_config(&self) -> CoreConfig {
        let hold_policy = i64::try_from(self.hold_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .map(HoldPolicy::new)
            .unwrap_or_default();
        CoreConfig::new(
            hold_policy,
            Duration::from_millis(self.call_timeout_ms),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            hold_ttl_secs: 900,
            call_timeout_ms: 5000,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
