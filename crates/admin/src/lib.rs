//! Emporium Admin library.
//!
//! The privileged side of the shop: assigning the `admin` claim and writing
//! products. Every request carries the caller's ID token, which is verified
//! against the identity service and must hold `admin: true` in its current
//! claims. Storefront-side admin checks are display hints only.
//!
//! # Security
//!
//! This crate holds the Firebase admin access token. Deploy it on a private
//! network only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
