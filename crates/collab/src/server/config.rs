//! Server configuration.
//!
//! Values come from defaults overridden by environment variables:
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `SCRIBE_BIND_ADDRESS` | address to bind | `0.0.0.0` |
//! | `SCRIBE_PORT` (or `PORT`) | port to listen on | `8080` |
//! | `SCRIBE_ALLOWED_ORIGINS` | comma-separated origins, `*` for any | `*` |
//! | `SCRIBE_MAX_CONNECTIONS` | cap on open connections | `1000` |
//! | `SCRIBE_TYPING_TIMEOUT_MS` | typing indicator window | `1000` |

use crate::typing::DEFAULT_TYPING_TIMEOUT;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which browser origins may open a WebSocket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parse `*` or a comma-separated list of origins.
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }

    /// Check a handshake's `Origin` header. Requests without one come from
    /// non-browser clients and are let through.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (AllowedOrigins::Any, _) | (_, None) => true,
            (AllowedOrigins::List(list), Some(origin)) => {
                let origin = origin.trim_end_matches('/');
                list.iter().any(|allowed| allowed == origin)
            }
        }
    }
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_address: String,
    /// Port to listen on.
    pub port: u16,
    /// Origins allowed to connect.
    pub allowed_origins: AllowedOrigins,
    /// Maximum total connections.
    pub max_total_connections: usize,
    /// How long a typing indicator lasts without a new signal.
    pub typing_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: AllowedOrigins::Any,
            max_total_connections: 1000,
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the full bind address.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Build a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(address) = lookup("SCRIBE_BIND_ADDRESS") {
            config.bind_address = address;
        }
        if let Some(port) = lookup("SCRIBE_PORT") {
            config.port = parse("SCRIBE_PORT", &port)?;
        } else if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(origins) = lookup("SCRIBE_ALLOWED_ORIGINS") {
            config.allowed_origins = AllowedOrigins::parse(&origins);
        }
        if let Some(max) = lookup("SCRIBE_MAX_CONNECTIONS") {
            config.max_total_connections = parse("SCRIBE_MAX_CONNECTIONS", &max)?;
        }
        if let Some(ms) = lookup("SCRIBE_TYPING_TIMEOUT_MS") {
            let ms: u64 = parse("SCRIBE_TYPING_TIMEOUT_MS", &ms)?;
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "SCRIBE_TYPING_TIMEOUT_MS",
                    value: ms.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            config.typing_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
