//! Password strength rules for new accounts.
//!
//! The identity service only enforces its own minimum length, so the shop
//! checks its stricter rules before calling `sign_up`.

use core::fmt;

use serde::Serialize;

use super::ValidationError;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Characters that count as "special".
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*";

/// A single password requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordRule {
    /// At least [`MIN_PASSWORD_LENGTH`] characters.
    Length,
    /// At least one ASCII uppercase letter.
    Uppercase,
    /// At least one ASCII digit.
    Digit,
    /// At least one of [`SPECIAL_CHARACTERS`].
    Special,
}

impl PasswordRule {
    /// Every rule, in display order.
    pub const ALL: [Self; 4] = [Self::Length, Self::Uppercase, Self::Digit, Self::Special];

    /// Whether `password` satisfies this rule.
    #[must_use]
    pub fn is_met(self, password: &str) -> bool {
        match self {
            Self::Length => password.chars().count() >= MIN_PASSWORD_LENGTH,
            Self::Uppercase => password.chars().any(|c| c.is_ascii_uppercase()),
            Self::Digit => password.chars().any(|c| c.is_ascii_digit()),
            Self::Special => password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
        }
    }
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length => write!(f, "at least {MIN_PASSWORD_LENGTH} characters"),
            Self::Uppercase => f.write_str("an uppercase letter (A-Z)"),
            Self::Digit => f.write_str("a digit (0-9)"),
            Self::Special => write!(f, "a special character ({SPECIAL_CHARACTERS})"),
        }
    }
}

/// Rules that `password` does not meet.
#[must_use]
pub fn unmet_rules(password: &str) -> Vec<PasswordRule> {
    PasswordRule::ALL
        .into_iter()
        .filter(|rule| !rule.is_met(password))
        .collect()
}

/// Validate a new password and its confirmation.
///
/// The confirmation is compared first, matching the registration form.
///
/// # Errors
///
/// Returns `ValidationError::PasswordMismatch` when the two differ and
/// `ValidationError::WeakPassword` with every unmet rule otherwise.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }

    let unmet = unmet_rules(password);
    if unmet.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword(unmet))
    }
}
