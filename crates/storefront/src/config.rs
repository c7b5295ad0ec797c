//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `FIREBASE_PROJECT_ID` - Firebase project id (when `EMPORIUM_BACKEND=firebase`)
//! - `FIREBASE_API_KEY` - Web API key of the project (when `EMPORIUM_BACKEND=firebase`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `EMPORIUM_BACKEND` - `firebase` or `memory` (default: firebase)
//! - `FIREBASE_ADMIN_ACCESS_TOKEN` - OAuth2 access token for privileged calls
//! - `BACKEND_TIMEOUT_SECS` - HTTP timeout for backend calls (default: 10)
//! - `CART_PERSIST_ATTEMPTS` - Attempts per cart write (default: 3)
//! - `CART_RETRY_BASE_MS` - First retry delay, doubled per attempt (default: 200)
//! - `SESSION_IDLE_MINUTES` - Idle time before a session context is dropped (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Which backend the services talk to
    pub backend: BackendConfig,
    /// Cart write retry policy
    pub cart_retry: CartRetryConfig,
    /// Idle time after which a live session context is dropped
    pub session_idle: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (production, staging, ...)
    pub sentry_environment: Option<String>,
}

/// Backend selection.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Hosted Firestore + Identity Toolkit.
    Firebase(FirebaseConfig),
    /// Process-local backend for development and tests.
    Memory,
}

/// Firebase project settings.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct FirebaseConfig {
    /// Project id, used in Firestore document paths
    pub project_id: String,
    /// Web API key (identifies the project, not a credential)
    pub api_key: SecretString,
    /// OAuth2 access token with admin rights, for claim updates and
    /// rule-bypassing document access
    pub admin_access_token: Option<SecretString>,
    /// Request timeout for every backend call
    pub timeout: Duration,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field(
                "admin_access_token",
                &self.admin_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Retry settings for cart persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartRetryConfig {
    /// Total attempts per cart write, including the first
    pub attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl Default for CartRetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let backend = BackendConfig::from_env()?;
        let cart_retry = CartRetryConfig::from_env()?;
        let session_idle = Duration::from_secs(parse_env::<u64>("SESSION_IDLE_MINUTES", "30")? * 60);

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            cart_retry,
            session_idle,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Configuration for tests and local development: memory backend,
    /// no retry delay.
    #[must_use]
    pub fn for_memory() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig::Memory,
            cart_retry: CartRetryConfig {
                attempts: 3,
                base_delay: Duration::ZERO,
            },
            session_idle: Duration::from_secs(30 * 60),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl BackendConfig {
    /// Read `EMPORIUM_BACKEND` and the settings of the chosen backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown backend name or missing Firebase
    /// settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("EMPORIUM_BACKEND", "firebase").as_str() {
            "firebase" => Ok(Self::Firebase(FirebaseConfig::from_env()?)),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidEnvVar(
                "EMPORIUM_BACKEND".to_string(),
                format!("expected 'firebase' or 'memory', got '{other}'"),
            )),
        }
    }
}

impl FirebaseConfig {
    /// Read the Firebase project settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the project id or API key is missing, or a
    /// provided secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let admin_access_token = match get_optional_env("FIREBASE_ADMIN_ACCESS_TOKEN") {
            Some(value) => {
                validate_secret_strength(&value, "FIREBASE_ADMIN_ACCESS_TOKEN")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            project_id: get_required_env("FIREBASE_PROJECT_ID")?,
            api_key: get_validated_secret("FIREBASE_API_KEY")?,
            admin_access_token,
            timeout: Duration::from_secs(parse_env("BACKEND_TIMEOUT_SECS", "10")?),
        })
    }

    /// The API key, for query strings.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl CartRetryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let attempts: u32 = parse_env("CART_PERSIST_ATTEMPTS", "3")?;
        if attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_PERSIST_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            attempts,
            base_delay: Duration::from_millis(parse_env("CART_RETRY_BASE_MS", "200")?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
pub(crate) fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_placeholder_api_key_rejected() {
        let err = validate_secret_strength("your-api-key-here", "FIREBASE_API_KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_realistic_api_key_accepted() {
        assert!(
            validate_secret_strength("AIzaSyD3xQ9pL7mN2vB8kR4tW1yH6jF0cE5gU", "FIREBASE_API_KEY")
                .is_ok()
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig::for_memory();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_firebase_config_debug_redacts_secrets() {
        let config = FirebaseConfig {
            project_id: "emporium-prod".to_string(),
            api_key: SecretString::from("AIzaSy-super-secret-key"),
            admin_access_token: Some(SecretString::from("ya29.super-secret-token")),
            timeout: Duration::from_secs(10),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("emporium-prod"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret"));
    }
}
