//! Server configuration.
//!
//! Values come from the environment (a `.env` file is loaded by the binary
//! via dotenvy) and fall back to the constants below.
//!
//! | Variable                     | Default     |
//! |------------------------------|-------------|
//! | `FUNDCOUNT_HOST`             | `0.0.0.0`   |
//! | `FUNDCOUNT_PORT`             | `3000`      |
//! | `FUNDCOUNT_MAX_UPLOAD_BYTES` | 50 MB       |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::ConfigError;

/// Default listen address.
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum upload size (in bytes).
///
/// 50 MB limit.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub const ENV_HOST: &str = "FUNDCOUNT_HOST";
pub const ENV_PORT: &str = "FUNDCOUNT_PORT";
pub const ENV_MAX_UPLOAD_BYTES: &str = "FUNDCOUNT_MAX_UPLOAD_BYTES";

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            host: parse_var(&lookup, ENV_HOST)?.unwrap_or(defaults.host),
            port: parse_var(&lookup, ENV_PORT)?.unwrap_or(defaults.port),
            max_upload_bytes: parse_var(&lookup, ENV_MAX_UPLOAD_BYTES)?
                .unwrap_or(defaults.max_upload_bytes),
        })
    }

    /// Override the port (e.g. from the command line).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.socket_addr().port(), 3000);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_HOST, "127.0.0.1"),
            (ENV_PORT, "8080"),
            (ENV_MAX_UPLOAD_BYTES, "1024"),
        ]))
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn test_blank_value_uses_default() {
        let config = ServerConfig::from_lookup(lookup(&[(ENV_PORT, " ")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_PORT, "eighty")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(ENV_PORT));
        assert!(msg.contains("eighty"));
    }

    #[test]
    fn test_with_port() {
        let config = ServerConfig::default().with_port(9000);
        assert_eq!(config.port, 9000);
    }
}
