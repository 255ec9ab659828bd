//! Ambient configuration and logging setup shared by the CLI and services:
//! whether to back the bus with a real Redis or the in-memory adapter, and
//! `tracing` initialization.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid REDIS_PORT: {0}")] InvalidPort(String),
}

/// Where the event bus should get its log store from, and at what default
/// verbosity to log.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub real_redis: bool,
    pub redis_host: String,
    pub redis_port: u16,
    pub log_filter: String,
}

impl BusConfig {
    /// Load from a `.env` file if present, then environment variables,
    /// falling back to the in-memory adapter and a fakeredis-equivalent
    /// local run.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let real_redis = std::env::var("REAL_REDIS")
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        let redis_host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
        let redis_port = std::env::var("REDIS_PORT")
            .unwrap_or_else(|_| "6379".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort(std::env::var("REDIS_PORT").unwrap_or_default()))?;
        let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(BusConfig {
            real_redis,
            redis_host,
            redis_port,
            log_filter,
        })
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

/// Install a `tracing` subscriber reading its filter from `RUST_LOG`
/// (defaulting to `info`). Safe to call once at process start.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_combines_host_and_port() {
        let config = BusConfig {
            real_redis: true,
            redis_host: "example".to_string(),
            redis_port: 6380,
            log_filter: "info".to_string(),
        };
        assert_eq!(config.redis_url(), "redis://example:6380");
    }
}
