//! Cart error types.

use thiserror::Error;

use emporium_core::backend::BackendError;

/// Errors returned by the cart manager.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart could not be loaded for the signed-in user.
    #[error("failed to load cart: {0}")]
    Load(#[source] BackendError),

    /// A mutation could not be persisted; the local cart was reverted to
    /// the last confirmed state.
    #[error("failed to save cart after {attempts} attempt(s): {source}")]
    Persistence {
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// The stored cart document is not a list of line items.
    #[error("stored cart is malformed: {0}")]
    Malformed(String),
}
