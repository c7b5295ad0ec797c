//! Firebase REST adapter for the backend traits.
//!
//! # Architecture
//!
//! - Firestore v1 REST for documents; `updateTime` is the revision
//! - Identity Toolkit v1 for password accounts and claims
//! - Secure Token API for forced ID token refresh
//! - No caching: every call goes to the backend
//!
//! # Example
//!
//! ```rust,ignore
//! use emporium_storefront::firebase::FirebaseBackend;
//!
//! let backend = FirebaseBackend::new(&config)?;
//! let cart = backend.get("carts", uid.as_str()).await?;
//! ```

mod firestore;
mod identity;
pub mod token;
pub mod value;

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use emporium_core::backend::BackendError;

use crate::config::FirebaseConfig;

const FIRESTORE_HOST: &str = "https://firestore.googleapis.com/v1";
const IDENTITY_HOST: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_HOST: &str = "https://securetoken.googleapis.com/v1";

/// Length of generated document ids.
const AUTO_ID_LENGTH: usize = 20;

/// Errors that can occur when talking to Firebase.
#[derive(Debug, Error)]
pub enum FirebaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error body.
    #[error("Firebase API error {status} ({code}): {message}")]
    Api {
        status: u16,
        /// gRPC status (`FAILED_PRECONDITION`) or Identity Toolkit code
        /// (`EMAIL_EXISTS`).
        code: String,
        message: String,
    },

    /// Response JSON did not have the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Firestore value could not be converted.
    #[error("Firestore value error: {0}")]
    Codec(String),

    /// ID token could not be read.
    #[error("ID token error: {0}")]
    Token(String),

    /// A privileged call was made without an admin access token.
    #[error("FIREBASE_ADMIN_ACCESS_TOKEN is not configured")]
    MissingAdminToken,

    /// Client could not be built.
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl From<FirebaseError> for BackendError {
    fn from(err: FirebaseError) -> Self {
        match err {
            FirebaseError::Http(e) if e.is_timeout() || e.is_connect() => {
                Self::Unavailable(e.to_string())
            }
            FirebaseError::Http(e) => Self::Http(e.to_string()),
            FirebaseError::Api {
                status,
                code,
                message,
            } => match code.as_str() {
                "FAILED_PRECONDITION" | "ABORTED" | "ALREADY_EXISTS" => Self::Conflict(message),
                "NOT_FOUND" | "USER_NOT_FOUND" => Self::NotFound(message),
                "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
                | "USER_DISABLED" => Self::InvalidCredentials,
                "EMAIL_EXISTS" => Self::EmailTaken,
                "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN"
                | "USER_TOKEN_EXPIRED" => Self::InvalidToken(code),
                "UNAVAILABLE" | "RESOURCE_EXHAUSTED" | "DEADLINE_EXCEEDED" => {
                    Self::Unavailable(message)
                }
                _ => Self::Status { status, message },
            },
            FirebaseError::Token(message) => Self::InvalidToken(message),
            FirebaseError::MissingAdminToken | FirebaseError::Setup(_) => {
                Self::Unavailable(err.to_string())
            }
            FirebaseError::Parse(_) | FirebaseError::Codec(_) => Self::Decode(err.to_string()),
        }
    }
}

/// Error body shared by Firestore and Identity Toolkit.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Pick the most specific code from an error body.
///
/// Identity Toolkit and Secure Token put their code in `message`
/// (`"WEAK_PASSWORD : Password should be at least 6 characters"`) and may
/// add a generic gRPC `status`; Firestore only has the gRPC status.
fn error_code(body: &ErrorBody) -> String {
    let head = body.message.split(" : ").next().unwrap_or_default().trim();
    let is_code = !head.is_empty() && head.chars().all(|c| c.is_ascii_uppercase() || c == '_');
    if is_code {
        head.to_string()
    } else {
        body.status.clone().unwrap_or_default()
    }
}

/// Client for one Firebase project.
///
/// Cheap to clone; implements [`DocumentStore`](emporium_core::backend::DocumentStore),
/// [`IdentityProvider`](emporium_core::backend::IdentityProvider) and
/// [`IdentityAdmin`](emporium_core::backend::IdentityAdmin).
#[derive(Clone)]
pub struct FirebaseBackend {
    inner: Arc<FirebaseBackendInner>,
}

struct FirebaseBackendInner {
    client: reqwest::Client,
    project_id: String,
    api_key: SecretString,
    admin_token: Option<SecretString>,
}

impl FirebaseBackend {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns `FirebaseError::Setup` if the HTTP client cannot be built.
    pub fn new(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("emporium/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FirebaseError::Setup(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(FirebaseBackendInner {
                client,
                project_id: config.project_id.clone(),
                api_key: config.api_key.clone(),
                admin_token: config.admin_access_token.clone(),
            }),
        })
    }

    fn client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    fn api_key(&self) -> &str {
        self.inner.api_key.expose_secret()
    }

    fn admin_token(&self) -> Result<&str, FirebaseError> {
        self.inner
            .admin_token
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .ok_or(FirebaseError::MissingAdminToken)
    }

    /// `projects/{p}/databases/(default)/documents`
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.inner.project_id
        )
    }

    /// Full resource name of a document.
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_root())
    }

    /// Attach credentials: the admin bearer token when configured,
    /// otherwise the API key.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.admin_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request.query(&[("key", self.api_key())]),
        }
    }

    /// Send a request and decode a JSON body, mapping error bodies.
    async fn send<T>(request: reqwest::RequestBuilder) -> Result<T, FirebaseError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => (error_code(&envelope.error), envelope.error.message),
                Err(_) => (
                    status.as_str().to_string(),
                    body.chars().take(200).collect(),
                ),
            };
            tracing::debug!(status = %status, code = %code, "Firebase API returned error");
            return Err(FirebaseError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(serde_json::from_str("{}")?);
        }
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Firebase response"
            );
            FirebaseError::Parse(e)
        })
    }
}

/// Generate a document id the way Firestore clients do: 20 alphanumerics.
#[must_use]
pub fn auto_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LENGTH)
        .map(char::from)
        .collect()
}
