//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, in-memory store)
//! 5. Rate limiting on auth routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{Shopper, require_user};
pub use rate_limit::{RateLimitError, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
