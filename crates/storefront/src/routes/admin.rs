//! Admin product handlers.
//!
//! Gated by the admin claim of the session's last refreshed token. The
//! privileged admin service performs its own verification.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use emporium_core::{Product, ProductForm, ProductId};

use crate::error::Result;
use crate::middleware::Shopper;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// `GET /api/admin/products`
pub async fn list(State(state): State<AppState>, shopper: Shopper) -> Result<Json<Vec<Product>>> {
    let ctx = shopper.lock().await;
    Ok(Json(state.products().list_products(&ctx.auth).await?))
}

/// `POST /api/admin/products`
pub async fn create(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let ctx = shopper.lock().await;
    let id = state.products().add_product(&ctx.auth, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: id.into_inner(),
        }),
    ))
}

/// `DELETE /api/admin/products/{id}`
pub async fn delete(
    State(state): State<AppState>,
    shopper: Shopper,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let ctx = shopper.lock().await;
    state
        .products()
        .delete_product(&ctx.auth, &ProductId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
