//! Core types for Emporium.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod claims;
pub mod email;
pub mod id;
pub mod password;
pub mod price;
pub mod product;
pub mod validation;

pub use cart::{CartItems, CartMutation, LineItem, MAX_QUANTITY};
pub use claims::{ADMIN_CLAIM, Claims};
pub use email::{Email, EmailError};
pub use id::*;
pub use password::{PasswordRule, validate_new_password};
pub use price::Price;
pub use product::{NewProduct, Product, ProductFilter, ProductForm, suggestions};
pub use validation::ValidationError;
