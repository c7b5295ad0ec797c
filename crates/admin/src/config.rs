//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FIREBASE_PROJECT_ID` - Firebase project id
//! - `FIREBASE_API_KEY` - Web API key of the project
//! - `FIREBASE_ADMIN_ACCESS_TOKEN` - OAuth2 access token with Identity Toolkit
//!   and Firestore scopes (HIGH PRIVILEGE)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `EMPORIUM_BACKEND` - `firebase` or `memory` (default: firebase)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use emporium_storefront::config::{BackendConfig, ConfigError};

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Host address to bind to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Backend holding users and products
    pub backend: BackendConfig,
    /// Emit logs as JSON
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, or if the Firebase
    /// backend is selected without an admin access token.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let backend = BackendConfig::from_env()?;
        if let BackendConfig::Firebase(firebase) = &backend {
            if firebase.admin_access_token.is_none() {
                return Err(ConfigError::MissingEnvVar(
                    "FIREBASE_ADMIN_ACCESS_TOKEN".to_string(),
                ));
            }
        }

        Ok(Self {
            host: parse_env("ADMIN_HOST", "127.0.0.1")?,
            port: parse_env("ADMIN_PORT", "3001")?,
            backend,
            json_logs: optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            sentry_dsn: optional_env("SENTRY_DSN"),
            sentry_environment: optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configuration for tests: memory backend on the default port.
    #[must_use]
    pub fn for_memory() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
            backend: BackendConfig::Memory,
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .unwrap_or_else(|| default.to_string())
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
