//! HTTP routes for the admin API.
//!
//! ```text
//! GET  /health         - Liveness
//! POST /api/admin      - {action: promote|demote, uid}
//! POST /api/products   - Create product
//! ```
//!
//! Other methods on the API paths answer 405.

pub mod claims;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::error::AppError;
use crate::state::AppState;

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Create the API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin",
            post(claims::update_claims).fallback(method_not_allowed),
        )
        .route(
            "/api/products",
            post(products::create).fallback(method_not_allowed),
        )
}

/// The full admin application with tracing and Sentry layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
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
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use emporium_core::backend::{DocumentStore, IdentityAdmin, IdentityProvider, PRODUCTS};
    use emporium_core::{Claims, Email};
    use emporium_storefront::memory::MemoryBackend;

    use super::*;
    use crate::config::AdminConfig;

    struct Fixture {
        backend: MemoryBackend,
        app: Router,
        admin_token: String,
        shopper_token: String,
        shopper_uid: String,
    }

    async fn fixture() -> Fixture {
        let backend = MemoryBackend::new();
        let admin = backend
            .sign_up(&Email::parse("szef@example.com").unwrap(), "Sklep123!")
            .await
            .unwrap();
        backend
            .set_custom_claims(&admin.identity.uid, &Claims::with_admin(true))
            .await
            .unwrap();
        let shopper = backend
            .sign_up(&Email::parse("ala@example.com").unwrap(), "Sklep123!")
            .await
            .unwrap();

        let state = AppState::new(
            AdminConfig::for_memory(),
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
        );
        Fixture {
            app: app(state),
            backend,
            admin_token: admin.id_token,
            shopper_token: shopper.id_token,
            shopper_uid: shopper.identity.uid.to_string(),
        }
    }

    fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_admin_promotes_user() {
        let f = fixture().await;
        let response = f
            .app
            .oneshot(post_json(
                "/api/admin",
                Some(&f.admin_token),
                &json!({"action": "promote", "uid": f.shopper_uid}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "User promoted");

        let shopper = f.backend.verify(&f.shopper_token).await.unwrap();
        assert!(shopper.claims.is_admin());
    }

    #[tokio::test]
    async fn test_missing_params() {
        let f = fixture().await;
        let response = f
            .app
            .oneshot(post_json(
                "/api/admin",
                Some(&f.admin_token),
                &json!({"action": "promote"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing params");
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let f = fixture().await;
        let response = f
            .app
            .oneshot(post_json(
                "/api/admin",
                Some(&f.admin_token),
                &json!({"action": "ban", "uid": f.shopper_uid}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Unknown action");
    }

    #[tokio::test]
    async fn test_unknown_uid_is_server_error_with_details() {
        let f = fixture().await;
        let response = f
            .app
            .oneshot(post_json(
                "/api/admin",
                Some(&f.admin_token),
                &json!({"action": "promote", "uid": "ghost"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Server error");
        assert!(body["details"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_non_admin_caller_is_forbidden() {
        let f = fixture().await;
        let response = f
            .app
            .oneshot(post_json(
                "/api/admin",
                Some(&f.shopper_token),
                &json!({"action": "promote", "uid": f.shopper_uid}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!f.backend.verify(&f.shopper_token).await.unwrap().claims.is_admin());
    }

    #[tokio::test]
    async fn test_missing_and_invalid_tokens() {
        let f = fixture().await;
        let body = json!({"action": "promote", "uid": f.shopper_uid});

        let response = f
            .app
            .clone()
            .oneshot(post_json("/api/admin", None, &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = f
            .app
            .oneshot(post_json("/api/admin", Some("forged"), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_other_methods_are_405() {
        let f = fixture().await;
        let response = f
            .app
            .oneshot(Request::get("/api/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(response).await["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_admin_creates_product() {
        let f = fixture().await;
        let response = f
            .app
            .oneshot(post_json(
                "/api/products",
                Some(&f.admin_token),
                &json!({"name": "Wazon", "price": 49.9, "stock": 2, "category": "dom"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();

        let doc = f.backend.get(PRODUCTS, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["name"], "Wazon");
        assert!(doc.data.contains_key("createdAt"));
    }

    #[tokio::test]
    async fn test_product_without_name_is_rejected() {
        let f = fixture().await;
        let response = f
            .app
            .oneshot(post_json(
                "/api/products",
                Some(&f.admin_token),
                &json!({"price": 10, "category": "dom"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(f.backend.count(PRODUCTS).await, 0);
    }
}
