//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};

use crate::error::CacheError;

const DEFAULT_REDIS_PORT: u16 = 6379;

// == Backend Kind ==
/// Which store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Local RocksDB directory
    Embedded,
    /// Remote Redis server
    Networked,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" | "rocksdb" | "badger" => Ok(BackendKind::Embedded),
            "networked" | "redis" => Ok(BackendKind::Networked),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown cache backend '{}'",
                other
            ))),
        }
    }
}

/// Settings for the embedded backend.
#[derive(Debug, Clone)]
pub struct EmbeddedConfig {
    /// Database directory
    pub path: PathBuf,
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./tmp/cache"),
        }
    }
}

/// Settings for the networked backend and its connection pool.
#[derive(Debug, Clone)]
pub struct NetworkedConfig {
    /// Full connection URL; when set, `host` and `password` are ignored
    pub url: Option<String>,
    /// Redis `host:port`
    pub host: String,
    /// Password sent with AUTH, used verbatim
    pub password: Option<String>,
    /// Namespace prepended to every key as `<prefix>:`
    pub prefix: String,
    /// Maximum open connections, idle or borrowed. Must be positive.
    pub max_active: u32,
    /// Idle connections the pool tries to keep open at all times.
    ///
    /// This is a floor, not a ceiling: r2d2 cannot cap idle connections.
    /// Surplus idle connections are closed after `idle_timeout_secs`.
    /// Zero means nothing is dialed until the first operation.
    pub min_idle: u32,
    /// Seconds an idle connection may sit before it is closed; 0 keeps them open
    pub idle_timeout_secs: u64,
    /// Seconds to wait when borrowing or dialing a connection
    pub connect_timeout_secs: u64,
}

impl NetworkedConfig {
    /// Resolves the server address and credentials.
    ///
    /// Host and password go straight into a `ConnectionInfo`, so passwords
    /// containing URL delimiters need no escaping.
    ///
    /// # Errors
    /// - `InvalidConfig` for a malformed URL, host or port
    pub fn connection_info(&self) -> Result<ConnectionInfo, CacheError> {
        if let Some(url) = &self.url {
            return url
                .as_str()
                .into_connection_info()
                .map_err(|e| CacheError::InvalidConfig(format!("redis url: {}", e)));
        }

        let (host, port) = match self.host.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    CacheError::InvalidConfig(format!("invalid redis port in '{}'", self.host))
                })?;
                (host, port)
            }
            None => (self.host.as_str(), DEFAULT_REDIS_PORT),
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(CacheError::InvalidConfig(format!(
                "missing redis host in '{}'",
                self.host
            )));
        }

        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                password: self.password.clone().filter(|p| !p.is_empty()),
                ..RedisConnectionInfo::default()
            },
        })
    }
}

impl Default for NetworkedConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: format!("127.0.0.1:{}", DEFAULT_REDIS_PORT),
            password: None,
            prefix: "cachette".to_string(),
            max_active: 10_000,
            min_idle: 0,
            idle_timeout_secs: 240,
            connect_timeout_secs: 5,
        }
    }
}

/// Cache configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Selected backend
    pub backend: BackendKind,
    pub embedded: EmbeddedConfig,
    pub networked: NetworkedConfig,
    /// Seconds between maintenance runs
    pub maintenance_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE` - `embedded` or `networked` (default: embedded)
    /// - `CACHE_DIR` - Embedded database directory (default: ./tmp/cache)
    /// - `REDIS_URL` - Full connection URL; overrides `REDIS_HOST`/`REDIS_PASSWORD`
    /// - `REDIS_HOST` - Redis `host:port` (default: 127.0.0.1:6379)
    /// - `REDIS_PASSWORD` - Redis password (default: none)
    /// - `REDIS_PREFIX` - Key namespace (default: cachette)
    /// - `REDIS_MAX_ACTIVE` - Pool size (default: 10000)
    /// - `REDIS_MIN_IDLE` - Idle connections kept open, a floor (default: 0)
    /// - `REDIS_IDLE_TIMEOUT` - Idle connection lifetime in seconds (default: 240)
    /// - `REDIS_CONNECT_TIMEOUT` - Borrow/dial timeout in seconds (default: 5)
    /// - `CACHE_MAINTENANCE_INTERVAL` - Seconds between maintenance runs (default: 86400)
    ///
    /// # Errors
    /// - `InvalidConfig` if `CACHE` names an unknown backend
    pub fn from_env() -> Result<Self, CacheError> {
        let defaults = Self::default();

        let backend = match env::var("CACHE") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => defaults.backend,
        };

        Ok(Self {
            backend,
            embedded: EmbeddedConfig {
                path: env::var("CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.embedded.path),
            },
            networked: NetworkedConfig {
                url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
                host: env::var("REDIS_HOST").unwrap_or(defaults.networked.host),
                password: env::var("REDIS_PASSWORD").ok(),
                prefix: env::var("REDIS_PREFIX").unwrap_or(defaults.networked.prefix),
                max_active: parse_env("REDIS_MAX_ACTIVE").unwrap_or(defaults.networked.max_active),
                min_idle: parse_env("REDIS_MIN_IDLE").unwrap_or(defaults.networked.min_idle),
                idle_timeout_secs: parse_env("REDIS_IDLE_TIMEOUT")
                    .unwrap_or(defaults.networked.idle_timeout_secs),
                connect_timeout_secs: parse_env("REDIS_CONNECT_TIMEOUT")
                    .unwrap_or(defaults.networked.connect_timeout_secs),
            },
            maintenance_interval: parse_env("CACHE_MAINTENANCE_INTERVAL")
                .unwrap_or(defaults.maintenance_interval),
        })
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Embedded,
            embedded: EmbeddedConfig::default(),
            networked: NetworkedConfig::default(),
            maintenance_interval: 86_400,
        }
    }
}
