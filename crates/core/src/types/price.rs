//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored in product and cart documents as plain JSON numbers
//! (the admin form writes `Number(price)`), so the serde representation is a
//! float while all arithmetic happens on [`Decimal`].

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// A non-negative unit price in the shop currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NegativePrice` for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::NegativePrice);
        }
        Ok(Self(amount))
    }

    /// Parse a price typed into a form field (`"1299.99"`, `"1299,99"`).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPrice` when the text is not a number
    /// and `ValidationError::NegativePrice` when it is below zero.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().replace(',', ".");
        let amount = normalized
            .parse::<Decimal>()
            .map_err(|_| ValidationError::InvalidPrice(input.to_owned()))?;
        Self::new(amount)
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    ///
    /// Quantities are applied verbatim, so a non-positive quantity yields a
    /// zero or negative line total. The product saturates at the `Decimal`
    /// range.
    #[must_use]
    pub fn times(&self, quantity: i64) -> Decimal {
        self.0.saturating_mul(Decimal::from(quantity))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
