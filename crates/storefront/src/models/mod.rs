//! Request and session types for the storefront API.

pub mod session;

pub use session::keys as session_keys;
