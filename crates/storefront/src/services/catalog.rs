//! Read access to the `products` collection.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use emporium_core::backend::{BackendError, Document, DocumentStore, PRODUCTS};
use emporium_core::{Product, ProductId};

/// Catalog read errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("catalog backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("product {id} is malformed: {message}")]
    Decode { id: String, message: String },
}

/// Decode a product document, taking the id from the document name.
pub(crate) fn product_from_document(doc: Document) -> Result<Product, CatalogError> {
    let id = doc.id.clone();
    serde_json::from_value(doc.into_value_with_id()).map_err(|e| CatalogError::Decode {
        id,
        message: e.to_string(),
    })
}

/// Product listing and lookup. Nothing is cached.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
}

impl Catalog {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Every product in backend order.
    ///
    /// Documents that do not decode as products are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Backend` if the collection cannot be listed.
    #[instrument(skip(self))]
    pub async fn fetch_products(&self) -> Result<Vec<Product>, CatalogError> {
        let docs = self.store.list(PRODUCTS).await?;
        let total = docs.len();
        let products: Vec<Product> = docs
            .into_iter()
            .filter_map(|doc| match product_from_document(doc) {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping product document");
                    None
                }
            })
            .collect();
        tracing::debug!(total, decoded = products.len(), "Fetched products");
        Ok(products)
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no document has this id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product_by_id(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let doc = self
            .store
            .get(PRODUCTS, id.as_str())
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        product_from_document(doc)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::memory::MemoryBackend;

    fn fields(value: serde_json::Value) -> Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> (MemoryBackend, Catalog) {
        let backend = MemoryBackend::new();
        backend
            .create(
                PRODUCTS,
                Some("lamp"),
                fields(json!({"name": "Lampa", "price": 129.99, "stock": 3, "category": "dom"})),
                &[],
            )
            .await
            .unwrap();
        backend
            .create(
                PRODUCTS,
                Some("mug"),
                fields(json!({"name": "Kubek", "price": 19, "category": "kuchnia"})),
                &[],
            )
            .await
            .unwrap();
        let catalog = Catalog::new(Arc::new(backend.clone()));
        (backend, catalog)
    }

    #[tokio::test]
    async fn test_fetch_products_returns_all() {
        let (_, catalog) = seeded().await;
        let products = catalog.fetch_products().await.unwrap();
        assert_eq!(products.len(), 2);
        let lamp = products.iter().find(|p| p.id.as_str() == "lamp").unwrap();
        assert_eq!(lamp.name, "Lampa");
        assert_eq!(lamp.stock, 3);
    }

    #[tokio::test]
    async fn test_fetch_products_skips_malformed_documents() {
        let (backend, catalog) = seeded().await;
        backend
            .create(PRODUCTS, Some("broken"), fields(json!({"price": "free"})), &[])
            .await
            .unwrap();
        let products = catalog.fetch_products().await.unwrap();
        assert_eq!(products.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_product_by_id() {
        let (_, catalog) = seeded().await;
        let mug = catalog.fetch_product_by_id(&ProductId::new("mug")).await.unwrap();
        assert_eq!(mug.category, "kuchnia");
    }

    #[tokio::test]
    async fn test_fetch_missing_product_is_not_found() {
        let (_, catalog) = seeded().await;
        let err = catalog
            .fetch_product_by_id(&ProductId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id.as_str() == "nope"));
    }
}
