//! Product management for admin sessions.
//!
//! The admin check here reads the session's cached claims and only decides
//! what the storefront offers. The privileged API in `emporium-admin`
//! verifies a fresh token before writing.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use emporium_core::backend::{BackendError, CREATED_AT, DocumentStore, PRODUCTS};
use emporium_core::{Product, ProductForm, ProductId, ValidationError};

use super::auth::AuthSession;
use super::catalog::{Catalog, CatalogError};

#[derive(Debug, Error)]
pub enum ProductAdminError {
    #[error("admin access required")]
    Forbidden,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("product backend error: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Product writes gated by the session's admin claim.
#[derive(Clone)]
pub struct ProductAdmin {
    store: Arc<dyn DocumentStore>,
    catalog: Catalog,
}

fn require_admin(session: &AuthSession) -> Result<(), ProductAdminError> {
    if session.is_admin() {
        Ok(())
    } else {
        tracing::warn!(uid = ?session.user().map(|u| u.uid), "Product management refused");
        Err(ProductAdminError::Forbidden)
    }
}

/// Validate `form` and write it as a new product with a server-assigned
/// `createdAt`. Performs no authorization.
///
/// # Errors
///
/// Returns `ProductAdminError::Validation` for missing or negative fields
/// and `ProductAdminError::Backend` if the write fails.
pub async fn insert_product(
    store: &dyn DocumentStore,
    form: ProductForm,
) -> Result<ProductId, ProductAdminError> {
    let product = form.validate()?;
    let data = match serde_json::to_value(&product) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            return Err(BackendError::Decode("product did not encode as an object".into()).into());
        }
    };
    let doc = store.create(PRODUCTS, None, data, &[CREATED_AT]).await?;

    tracing::info!(product_id = %doc.id, name = %product.name, "Product added");
    Ok(ProductId::new(doc.id))
}

impl ProductAdmin {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let catalog = Catalog::new(Arc::clone(&store));
        Self { store, catalog }
    }

    /// Create a product from form input with a server-assigned `createdAt`.
    ///
    /// # Errors
    ///
    /// Returns `ProductAdminError::Forbidden` for a non-admin session and
    /// `ProductAdminError::Validation` for missing or negative fields.
    #[instrument(skip(self, session, form))]
    pub async fn add_product(
        &self,
        session: &AuthSession,
        form: ProductForm,
    ) -> Result<ProductId, ProductAdminError> {
        require_admin(session)?;
        insert_product(self.store.as_ref(), form).await
    }

    /// Every product, as the admin panel lists them.
    ///
    /// # Errors
    ///
    /// Returns `ProductAdminError::Forbidden` for a non-admin session.
    #[instrument(skip(self, session))]
    pub async fn list_products(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<Product>, ProductAdminError> {
        require_admin(session)?;
        Ok(self.catalog.fetch_products().await?)
    }

    /// Delete a product. Line items already in carts keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ProductAdminError::Forbidden` for a non-admin session.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        session: &AuthSession,
        id: &ProductId,
    ) -> Result<(), ProductAdminError> {
        require_admin(session)?;
        self.store.delete(PRODUCTS, id.as_str()).await?;
        tracing::info!("Product deleted");
        Ok(())
    }
}
