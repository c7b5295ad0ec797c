//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Backend reachability
//!
//! # Auth (rate limited)
//! POST   /api/auth/login                - Sign in
//! POST   /api/auth/register             - Create account (no sign-in)
//! POST   /api/auth/logout               - Sign out
//! GET    /api/auth/me                   - Current user
//!
//! # Catalog
//! GET    /api/products?search=&category= - Filtered product list
//! GET    /api/products/{id}             - Product with suggestions
//!
//! # Cart (signed in)
//! GET    /api/cart                      - Cart
//! DELETE /api/cart                      - Clear cart
//! POST   /api/cart/items                - Add product
//! PATCH  /api/cart/items/{product_id}   - Set quantity
//! DELETE /api/cart/items/{product_id}   - Remove product
//!
//! # Admin (admin claim)
//! GET    /api/admin/products            - Product list
//! POST   /api/admin/products            - Create product
//! DELETE /api/admin/products/{id}       - Delete product
//!
//! # Orders (signed in)
//! POST   /api/orders                    - Record order
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, patch, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use emporium_core::ProductId;

use crate::middleware::{
    RateLimitError, auth_rate_limiter, create_session_layer, request_id_middleware,
};
use crate::services::CatalogError;
use crate::state::AppState;

/// Probe id used by the readiness check.
const READINESS_PROBE_ID: &str = "_readiness";

/// Create the auth routes router.
///
/// # Errors
///
/// Returns an error if the rate limiter cannot be configured.
pub fn auth_routes() -> Result<Router<AppState>, RateLimitError> {
    Ok(Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .layer(auth_rate_limiter()?))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            patch(cart::update).delete(cart::remove),
        )
}

/// Create the admin product routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin::list).post(admin::create))
        .route("/products/{id}", delete(admin::delete))
}

/// Create all API routes.
///
/// # Errors
///
/// Returns an error if the rate limiter cannot be configured.
pub fn routes() -> Result<Router<AppState>, RateLimitError> {
    Ok(Router::new()
        .nest("/api/auth", auth_routes()?)
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/admin", admin_routes())
        .route("/api/orders", post(orders::create)))
}

/// The full storefront application: routes, session, tracing and Sentry
/// layers.
///
/// # Errors
///
/// Returns an error if the rate limiter cannot be configured.
pub fn app(state: AppState) -> Result<Router, RateLimitError> {
    let session_layer = create_session_layer(state.config());

    Ok(Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes()?)
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Looks up a probe product; any answer from the backend, including
/// "not found", means it is reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state
        .catalog()
        .fetch_product_by_id(&ProductId::new(READINESS_PROBE_ID))
        .await
    {
        Ok(_) | Err(CatalogError::NotFound(_) | CatalogError::Decode { .. }) => StatusCode::OK,
        Err(CatalogError::Backend(e)) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
