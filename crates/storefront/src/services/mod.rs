//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in state and claims of one browser session
//! - `cart` - Per-user cart with conditional, retried persistence
//! - `catalog` - Product listing and lookup
//! - `products` - Admin product management
//! - `orders` - Opaque order records
//! - `context` - Per-browser bundles of the above, held in a cache

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod context;
pub mod orders;
pub mod products;

pub use auth::{AuthError, AuthSession, AuthState, AuthWatcher};
pub use cart::{CartError, CartManager, CartSnapshot, CartStatus, CartWrite};
pub use catalog::{Catalog, CatalogError};
pub use context::{SessionContext, SessionContexts};
pub use orders::{OrderError, Orders};
pub use products::{ProductAdmin, ProductAdminError, insert_product};
