//! Order records.
//!
//! Orders are opaque JSON objects appended to the `orders` collection.
//! There is no read path and no payment processing.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use emporium_core::backend::{BackendError, CREATED_AT, DocumentStore, Identity, ORDERS};
use emporium_core::OrderId;

/// Field stamped with the ordering user's uid.
pub const UID_FIELD: &str = "uid";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order payload must be a JSON object")]
    NotAnObject,

    #[error("order backend error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Clone)]
pub struct Orders {
    store: Arc<dyn DocumentStore>,
}

impl Orders {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Store `payload` under an auto-generated id, stamped with the caller's
    /// uid and a server timestamp.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAnObject` if `payload` is not an object.
    #[instrument(skip(self, payload), fields(uid = %user.uid))]
    pub async fn create_order(&self, user: &Identity, payload: Value) -> Result<OrderId, OrderError> {
        let Value::Object(mut data) = payload else {
            return Err(OrderError::NotAnObject);
        };
        data.insert(UID_FIELD.to_string(), Value::String(user.uid.to_string()));

        let doc = self.store.create(ORDERS, None, data, &[CREATED_AT]).await?;
        tracing::info!(order_id = %doc.id, "Order recorded");
        Ok(OrderId::new(doc.id))
    }
}
