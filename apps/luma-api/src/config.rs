//! Server configuration, driven by environment variables.

use std::net::{Ipv4Addr, SocketAddr};

use crate::error::ApiError;

/// Variable holding the listen port.
pub const PORT_VAR: &str = "PORT";
/// Variable holding the log level filter.
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration of the API server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Address to bind, always on every interface.
    pub listen_addr: SocketAddr,
    /// Log level.
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            log_level: "info".to_owned(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup(PORT_VAR).filter(|v| !v.trim().is_empty()) {
            let port: u16 = v
                .trim()
                .parse()
                .map_err(|_| ApiError::InvalidPort(v.clone()))?;
            config.listen_addr.set_port(port);
        }
        if let Some(v) = lookup(LOG_LEVEL_VAR).filter(|v| !v.trim().is_empty()) {
            config.log_level = v;
        }

        Ok(config)
    }
}
