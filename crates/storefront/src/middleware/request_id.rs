//! Request correlation ids.
//!
//! An `x-request-id` set by the proxy in front of the storefront is kept if
//! it looks like an id; anything else is replaced with a UUID v4. The id ends
//! up on the `http_request` span, as a Sentry tag and on the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_UPSTREAM_ID_LEN: usize = 128;

/// Upstream ids are echoed into logs and headers, so only short tokens of
/// `[A-Za-z0-9._-]` are trusted.
fn upstream_id(request: &Request) -> Option<String> {
    let raw = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !raw.is_empty()
        && raw.len() <= MAX_UPSTREAM_ID_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    valid.then(|| raw.to_owned())
}

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = upstream_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &request_id));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
