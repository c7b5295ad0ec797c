//! Emporium storefront library.
//!
//! Session-scoped auth and cart state over a hosted document store and
//! identity service, exposed as a JSON API. The binary in `main.rs` only
//! loads configuration, installs tracing and serves [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod firebase;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
