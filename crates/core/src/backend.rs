//! Contract with the hosted backend.
//!
//! The shop keeps no data of its own: products, carts and orders live in a
//! document store and users in an identity service. These traits are the
//! seams; the storefront crate provides a REST adapter and an in-memory one.

use core::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{Claims, Email, Uid};

/// Collection holding catalog products.
pub const PRODUCTS: &str = "products";
/// Collection holding one cart document per user, keyed by uid.
pub const CARTS: &str = "carts";
/// Collection holding submitted orders.
pub const ORDERS: &str = "orders";

/// Field names stamped with the server time on create.
pub const CREATED_AT: &str = "createdAt";

/// Opaque document version, changed by every write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub revision: Revision,
    pub data: Map<String, Value>,
}

impl Document {
    /// The document fields plus its id under `"id"`.
    ///
    /// Product documents do not store their own id, so this is the shape
    /// the catalog types deserialize from.
    #[must_use]
    pub fn into_value_with_id(self) -> Value {
        let mut data = self.data;
        data.insert("id".to_owned(), Value::String(self.id));
        Value::Object(data)
    }
}

/// Condition a write must satisfy to be applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Precondition {
    /// Unconditional write; creates the document if missing.
    #[default]
    None,
    /// The document must already exist.
    Exists,
    /// The document must still be at this revision.
    Revision(Revision),
}

/// Errors returned by backend adapters.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure (connection, timeout, TLS).
    #[error("backend request failed: {0}")]
    Http(String),

    /// The backend answered with an error status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A conditional write lost against a concurrent writer.
    #[error("document {0} was modified concurrently")]
    Conflict(String),

    /// Document or account does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Credentials were rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The email is already registered.
    #[error("email already in use")]
    EmailTaken,

    /// The token is expired, revoked or malformed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Response body could not be decoded.
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    /// Backend is not reachable or refused the operation for capacity.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Unavailable(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Document store collaborator.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError>;

    /// Read every document in a collection.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, BackendError>;

    /// Create a document. A `None` id lets the backend pick one.
    ///
    /// Fields named in `server_timestamps` are set to the server time.
    async fn create(
        &self,
        collection: &str,
        id: Option<&str>,
        data: Map<String, Value>,
        server_timestamps: &[&str],
    ) -> Result<Document, BackendError>;

    /// Write one field of a document, subject to `precondition`.
    ///
    /// Returns the new revision. A failed revision precondition is
    /// reported as [`BackendError::Conflict`].
    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
        precondition: Precondition,
    ) -> Result<Revision, BackendError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError>;
}

/// A signed-in user as seen by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: Uid,
    pub email: Option<Email>,
    /// Custom claims from the most recent token.
    #[serde(default)]
    pub claims: Claims,
}

/// Tokens for a signed-in user.
///
/// The refresh token is what survives a restart; the id token is short-lived
/// and carries the claims.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySession {
    pub identity: Identity,
    pub id_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for IdentitySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySession")
            .field("identity", &self.identity)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Identity service collaborator used by shoppers.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &str)
    -> Result<IdentitySession, BackendError>;

    /// Create an account. The returned session is not retained by callers
    /// that register without signing in.
    async fn sign_up(&self, email: &Email, password: &str)
    -> Result<IdentitySession, BackendError>;

    /// Exchange the refresh token for a fresh id token, re-reading claims.
    async fn refresh(&self, session: &IdentitySession) -> Result<IdentitySession, BackendError>;
}

/// Privileged identity operations.
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Validate an id token against the identity service and return the
    /// account with its current custom claims.
    async fn verify(&self, id_token: &str) -> Result<Identity, BackendError>;

    /// Replace the custom claims of `uid`.
    async fn set_custom_claims(&self, uid: &Uid, claims: &Claims) -> Result<(), BackendError>;
}
