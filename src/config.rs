//! Environment-driven configuration.
//! `SESSION_STORE=redis://host:port/databaseIndex` selects the networked
//! session backend; any other value, or no value at all, selects the
//! in-memory backend. A malformed redis descriptor aborts startup before the
//! listener binds.

use thiserror::Error;

pub const SESSION_STORE_ENV: &str = "SESSION_STORE";
pub const HTTP_PORT_ENV: &str = "THINGAMABOB_HTTP_PORT";
pub const DEFAULT_HTTP_PORT: u16 = 3001;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid redis connection string: {0}")]
    InvalidRedisConnStr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: i64,
}

/// Which session backend to run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreConfig {
    Memory,
    Redis(RedisConfig),
}

impl SessionStoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(SESSION_STORE_ENV) {
            Ok(v) if v.starts_with("redis://") => {
                Ok(SessionStoreConfig::Redis(parse_redis_conn_str(&v)?))
            }
            _ => Ok(SessionStoreConfig::Memory),
        }
    }
}

/// Parse a `redis://host:port/databaseIndex` connection descriptor.
pub fn parse_redis_conn_str(conn_str: &str) -> Result<RedisConfig, ConfigError> {
    let bad = || ConfigError::InvalidRedisConnStr(conn_str.to_string());

    let rest = conn_str.strip_prefix("redis://").ok_or_else(bad)?;
    let (host_port, db) = rest.split_once('/').ok_or_else(bad)?;
    let (host, port) = host_port.split_once(':').ok_or_else(bad)?;
    if host.is_empty() {
        return Err(bad());
    }
    let port: u16 = port.parse().map_err(|_| bad())?;
    let database: i64 = db.parse().map_err(|_| bad())?;

    Ok(RedisConfig {
        host: host.to_string(),
        port,
        database,
    })
}

pub fn http_port() -> u16 {
    std::env::var(HTTP_PORT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_HTTP_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_descriptor() {
        let cfg = parse_redis_conn_str("redis://cache.internal:6379/2").unwrap();
        assert_eq!(
            cfg,
            RedisConfig {
                host: "cache.internal".to_string(),
                port: 6379,
                database: 2,
            }
        );
    }

    #[test]
    fn rejects_malformed_descriptors() {
        for bad in [
            "redis://",
            "redis://localhost",
            "redis://localhost/0",
            "redis://localhost:6379",
            "redis://:6379/0",
            "redis://localhost:nope/0",
            "redis://localhost:6379/zero",
            "redis://localhost:6379/0/extra",
            "memcached://localhost:11211/0",
        ] {
            assert!(
                parse_redis_conn_str(bad).is_err(),
                "expected {bad:?} to be rejected"
            );
        }
    }
}
