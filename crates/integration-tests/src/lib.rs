//! End-to-end test harness for Emporium.
//!
//! [`TestApp`] wires the storefront and the admin API to one shared
//! in-memory backend and drives both routers in-process. A [`Browser`]
//! carries the session cookie between storefront requests the way a real
//! browser would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//!
//! # Against a deployed storefront
//! STOREFRONT_BASE_URL=https://shop.example.com \
//!     cargo test -p emporium-integration-tests -- --ignored
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use emporium_admin::config::AdminConfig;
use emporium_core::backend::{
    DocumentStore, IdentityAdmin, IdentityProvider, IdentitySession, PRODUCTS,
};
use emporium_core::{Claims, Email};
use emporium_storefront::config::StorefrontConfig;
use emporium_storefront::memory::MemoryBackend;

/// Password that satisfies the registration rules.
pub const PASSWORD: &str = "Sklep123!";

/// Each request gets its own client address so the auth rate limiter never
/// trips across tests.
fn next_client_ip() -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(1);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff)
}

/// Storefront and admin API over one memory backend.
pub struct TestApp {
    pub backend: MemoryBackend,
    pub storefront: Router,
    pub admin: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let backend = MemoryBackend::new();
        let storefront = emporium_storefront::routes::app(
            emporium_storefront::state::AppState::new(
                StorefrontConfig::for_memory(),
                Arc::new(backend.clone()),
                Arc::new(backend.clone()),
            ),
        )
        .expect("storefront router");
        let admin = emporium_admin::routes::app(emporium_admin::state::AppState::new(
            AdminConfig::for_memory(),
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
        ));
        Self {
            backend,
            storefront,
            admin,
        }
    }

    /// A fresh browser with no cookies.
    #[must_use]
    pub fn browser(&self) -> Browser {
        Browser {
            app: self.storefront.clone(),
            cookie: None,
        }
    }

    /// Create an account directly in the backend and return its tokens.
    pub async fn create_user(&self, email: &str, admin: bool) -> IdentitySession {
        let created = self
            .backend
            .sign_up(&Email::parse(email).unwrap(), PASSWORD)
            .await
            .unwrap();
        if admin {
            self.backend
                .set_custom_claims(&created.identity.uid, &Claims::with_admin(true))
                .await
                .unwrap();
        }
        created
    }

    /// Write a product document with a fixed id.
    pub async fn put_product(&self, id: &str, name: &str, price: f64, category: &str) {
        let data = json!({
            "name": name,
            "description": "",
            "price": price,
            "stock": 10,
            "imageURL": "",
            "category": category,
        });
        self.backend
            .create(PRODUCTS, Some(id), data.as_object().cloned().unwrap(), &[])
            .await
            .unwrap();
    }

    /// Call the admin API with an optional bearer token.
    pub async fn admin_call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let response = self
            .admin
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        split(response).await
    }
}

/// A storefront client that keeps its session cookie.
pub struct Browser {
    app: Router,
    cookie: Option<String>,
}

impl Browser {
    pub async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Register and sign in.
    pub async fn sign_up_and_in(&mut self, email: &str) -> Value {
        let (status, _) = self
            .post(
                "/api/auth/register",
                json!({"email": email, "password": PASSWORD, "passwordConfirm": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.sign_in(email).await
    }

    pub async fn sign_in(&mut self, email: &str) -> Value {
        let (status, user) = self
            .post(
                "/api/auth/login",
                json!({"email": email, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {user}");
        user
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", next_client_ip());
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().to_string();
            self.cookie = Some(pair);
        }
        split(response).await
    }
}

async fn split(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}
