//! HTTP middleware for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. `VerifiedAdmin` extractor on every privileged handler

pub mod auth;

pub use auth::VerifiedAdmin;
