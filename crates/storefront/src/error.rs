//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use emporium_core::ValidationError;

use crate::services::{
    AuthError, CartError, CatalogError, OrderError, ProductAdminError,
};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart could not be loaded or saved.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Product listing or lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Admin product operation failed.
    #[error("Product error: {0}")]
    Products(#[from] ProductAdminError),

    /// Order could not be recorded.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Request input rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Registration(_) | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::Backend(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Cart(err) => match err {
                CartError::Persistence { .. } => StatusCode::SERVICE_UNAVAILABLE,
                CartError::Load(_) => StatusCode::BAD_GATEWAY,
                CartError::Malformed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => catalog_status(err),
            Self::Products(err) => match err {
                ProductAdminError::Forbidden => StatusCode::FORBIDDEN,
                ProductAdminError::Validation(_) => StatusCode::BAD_REQUEST,
                ProductAdminError::Backend(_) => StatusCode::BAD_GATEWAY,
                ProductAdminError::Catalog(err) => catalog_status(err),
            },
            Self::Order(err) => match err {
                OrderError::NotAnObject => StatusCode::BAD_REQUEST,
                OrderError::Backend(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Server-side failures are not described.
    fn public_message(&self) -> String {
        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::Auth(AuthError::Registration(msg)) => msg.clone(),
            Self::Auth(AuthError::Validation(err))
            | Self::Products(ProductAdminError::Validation(err))
            | Self::Validation(err) => err.to_string(),
            Self::Cart(CartError::Persistence { .. }) => {
                "Cart could not be saved, please try again".to_string()
            }
            Self::Catalog(CatalogError::NotFound(id))
            | Self::Products(ProductAdminError::Catalog(CatalogError::NotFound(id))) => {
                format!("Product {id} not found")
            }
            Self::Products(ProductAdminError::Forbidden) => "Admin access required".to_string(),
            Self::Order(OrderError::NotAnObject) => OrderError::NotAnObject.to_string(),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            _ if self.status() == StatusCode::BAD_GATEWAY => "External service error".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Backend(_) => StatusCode::BAD_GATEWAY,
        CatalogError::Decode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use emporium_core::ProductId;
    use emporium_core::backend::BackendError;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(CatalogError::NotFound(ProductId::new("p1")).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ProductAdminError::Forbidden.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ValidationError::Quantity(0).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                CartError::Persistence {
                    attempts: 3,
                    source: BackendError::Unavailable("down".into()),
                }
                .into()
            ),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_backend_details_are_hidden() {
        let err = AppError::from(CatalogError::Backend(BackendError::Status {
            status: 403,
            message: "PERMISSION_DENIED projects/secret".to_string(),
        }));
        assert_eq!(err.public_message(), "External service error");
    }
}
