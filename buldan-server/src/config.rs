//! Server configuration.
//!
//! Defaults are usable as-is; every field can be overridden from the
//! environment. Unparseable values fall back to the default with a warning.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::session::DEFAULT_QUEUE_CAPACITY;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Capacity of each player's event queue.
    pub event_queue_capacity: usize,
    /// Connections silent for longer than this are closed.
    pub idle_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            event_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_timeout: Duration::from_secs(300),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    ///
    /// - `BULDAN_BIND_ADDR`
    /// - `BULDAN_MAX_CONNECTIONS`
    /// - `BULDAN_EVENT_QUEUE`
    /// - `BULDAN_IDLE_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind_addr: parse_or("BULDAN_BIND_ADDR", &lookup, defaults.bind_addr),
            max_connections: parse_or("BULDAN_MAX_CONNECTIONS", &lookup, defaults.max_connections),
            event_queue_capacity: parse_or("BULDAN_EVENT_QUEUE", &lookup, defaults.event_queue_capacity)
                .max(1),
            idle_timeout: Duration::from_secs(parse_or(
                "BULDAN_IDLE_TIMEOUT_SECS",
                &lookup,
                defaults.idle_timeout.as_secs(),
            )),
            version: defaults.version,
        }
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}", key, raw);
                default
            }
        },
        None => default,
    }
}
