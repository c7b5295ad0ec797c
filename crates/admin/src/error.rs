//! Unified error handling for admin.
//!
//! Responses are JSON objects with an `error` message. Backend failures also
//! carry `details`, since this API is only reachable by operators.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use emporium_core::ValidationError;
use emporium_core::backend::BackendError;
use emporium_storefront::services::ProductAdminError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// No bearer token on the request.
    #[error("Missing bearer token")]
    MissingToken,

    /// The identity service rejected the token.
    #[error("Invalid token: {0}")]
    InvalidToken(BackendError),

    /// Verified caller without the admin claim.
    #[error("Forbidden: admin claim required")]
    Forbidden,

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Product fields rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// HTTP method not supported on this path.
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl From<ProductAdminError> for AppError {
    fn from(err: ProductAdminError) -> Self {
        match err {
            ProductAdminError::Validation(e) => Self::Validation(e),
            ProductAdminError::Backend(e) => Self::Backend(e),
            ProductAdminError::Forbidden => Self::Forbidden,
            ProductAdminError::Catalog(e) => Self::Backend(BackendError::Decode(e.to_string())),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingToken | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        };

        let body = match &self {
            Self::Backend(e) => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    "Admin request error"
                );
                json!({ "error": "Server error", "details": e.to_string() })
            }
            Self::InvalidToken(e) => {
                tracing::warn!(error = %e, "Rejected admin token");
                json!({ "error": "Invalid token" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::BadRequest("Missing params".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Backend(BackendError::Unavailable("down".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::MethodNotAllowed.into_response().status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
