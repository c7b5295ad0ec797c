//! Boundary validation errors.
//!
//! Raised before any backend call is made: registration forms, product
//! forms and cart quantity inputs.

use thiserror::Error;

use super::PasswordRule;

/// Input rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Email address is malformed.
    #[error("invalid email: {0}")]
    Email(#[from] super::EmailError),

    /// Password does not satisfy the strength rules.
    #[error("password must have {}", describe_rules(.0))]
    WeakPassword(Vec<PasswordRule>),

    /// Password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// A required form field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Price text is not a number.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Price is below zero.
    #[error("price cannot be negative")]
    NegativePrice,

    /// Stock is below zero.
    #[error("stock cannot be negative")]
    NegativeStock,

    /// Cart quantity outside `1..=MAX_QUANTITY`.
    #[error("quantity must be between 1 and {max} (got {0})", max = super::MAX_QUANTITY)]
    Quantity(i64),
}

fn describe_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
