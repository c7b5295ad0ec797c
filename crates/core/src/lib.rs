//! Emporium Core - Shared types library.
//!
//! This crate provides common types used across all Emporium components:
//! - `storefront` - Customer-facing catalog, cart and sign-in
//! - `admin` - Privileged API for claim assignment and product writes
//! - `cli` - Command-line tools for admin promotion and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! The hosted backend (document store and identity service) is described by
//! the traits in [`backend`]; concrete adapters live in the storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Ids, emails, prices, claims, products and cart line items
//! - [`backend`] - Backend collaborator contract

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod types;

pub use types::*;
