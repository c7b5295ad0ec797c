//! Authentication error types.

use thiserror::Error;

use emporium_core::ValidationError;
use emporium_core::backend::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email/password, or the account is disabled.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The identity service refused to create the account.
    #[error("registration failed: {0}")]
    Registration(String),

    /// Input rejected before reaching the identity service.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Identity service failure.
    #[error("identity service error: {0}")]
    Backend(BackendError),
}

impl AuthError {
    /// Classify a backend error from a sign-in call.
    pub(crate) fn from_sign_in(err: BackendError) -> Self {
        match err {
            BackendError::InvalidCredentials | BackendError::NotFound(_) => {
                Self::InvalidCredentials
            }
            other => Self::Backend(other),
        }
    }

    /// Classify a backend error from a sign-up call.
    pub(crate) fn from_sign_up(err: BackendError) -> Self {
        match err {
            BackendError::EmailTaken => {
                Self::Registration("an account with this email already exists".to_string())
            }
            BackendError::Status { status, message } if status < 500 => {
                Self::Registration(message)
            }
            other => Self::Backend(other),
        }
    }
}

impl From<emporium_core::EmailError> for AuthError {
    fn from(err: emporium_core::EmailError) -> Self {
        Self::Validation(ValidationError::from(err))
    }
}
