//! Catalog seeding.
//!
//! The seed file is a YAML list of product forms:
//!
//! ```yaml
//! - name: Wazon
//!   description: Ręcznie robiony
//!   price: 49.90
//!   stock: 7
//!   imageURL: https://example.com/wazon.jpg
//!   category: dom
//! ```
//!
//! Every entry is validated before anything is written, so a bad file
//! creates no products.

use std::path::Path;

use emporium_core::ProductForm;
use emporium_core::backend::DocumentStore;
use emporium_storefront::services::insert_product;

use super::CommandError;

/// Read `path` and create its products. Returns the number created.
pub async fn products_from_file(
    store: &dyn DocumentStore,
    path: &Path,
) -> Result<usize, CommandError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Read {
            path: path.display().to_string(),
            source,
        })?;
    tracing::info!(path = %path.display(), "Loading products");
    products_from_yaml(store, &content).await
}

/// Create the products listed in `yaml`.
pub async fn products_from_yaml(
    store: &dyn DocumentStore,
    yaml: &str,
) -> Result<usize, CommandError> {
    let forms: Vec<ProductForm> = serde_yaml::from_str(yaml)?;

    for (index, form) in forms.iter().enumerate() {
        if let Err(e) = form.clone().validate() {
            return Err(CommandError::Product {
                index,
                name: form.name.clone(),
                source: e.into(),
            });
        }
    }

    let total = forms.len();
    for (index, form) in forms.into_iter().enumerate() {
        let name = form.name.clone();
        let id = insert_product(store, form)
            .await
            .map_err(|source| CommandError::Product {
                index,
                name: name.clone(),
                source,
            })?;
        tracing::info!(%id, %name, "Product created");
    }
    Ok(total)
}
