//! `POST /api/products`: create a product.

use axum::{Json, extract::State};
use serde::Serialize;

use emporium_core::ProductForm;
use emporium_storefront::services::insert_product;

use crate::error::Result;
use crate::middleware::VerifiedAdmin;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

pub async fn create(
    State(state): State<AppState>,
    VerifiedAdmin(caller): VerifiedAdmin,
    Json(form): Json<ProductForm>,
) -> Result<Json<CreatedResponse>> {
    let id = insert_product(state.store(), form).await?;
    tracing::info!(caller = %caller.uid, product_id = %id, "Product created");
    Ok(Json(CreatedResponse {
        id: id.into_inner(),
    }))
}
