//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;

use emporium_core::{Product, ProductFilter, ProductId, suggestions};

use crate::error::Result;
use crate::state::AppState;

/// A product with related products from the same category.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub suggestions: Vec<Product>,
}

/// `GET /api/products?search=&category=`
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().fetch_products().await?;
    Ok(Json(filter.apply(products)))
}

/// `GET /api/products/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>> {
    let catalog = state.catalog();
    let product = catalog.fetch_product_by_id(&ProductId::new(id)).await?;
    let all = catalog.fetch_products().await?;
    let suggestions = suggestions(&product, &all).into_iter().cloned().collect();
    Ok(Json(ProductDetail {
        product,
        suggestions,
    }))
}
