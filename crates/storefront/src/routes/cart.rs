//! Cart route handlers.
//!
//! Every mutation answers with the cart as it stands afterwards. A change
//! that could not be saved is answered with 503 and the cart is left at its
//! last saved state.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::{LineItem, MAX_QUANTITY, ProductId, ValidationError};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{Shopper, require_user};
use crate::services::{CartManager, CartStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub item_count: i64,
    pub status: CartStatus,
}

impl From<&CartManager> for CartView {
    fn from(cart: &CartManager) -> Self {
        Self {
            items: cart.items().as_slice().to_vec(),
            total: cart.total(),
            item_count: cart.item_count(),
            status: cart.status(),
        }
    }
}

/// Quantities from clients must lie in `1..=MAX_QUANTITY`.
fn checked_quantity(quantity: i64) -> std::result::Result<i64, ValidationError> {
    if (1..=MAX_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(ValidationError::Quantity(quantity))
    }
}

/// `GET /api/cart`
pub async fn show(shopper: Shopper) -> Json<CartView> {
    let ctx = shopper.lock().await;
    Json(CartView::from(&ctx.cart))
}

/// `POST /api/cart/items`
pub async fn add(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let quantity = checked_quantity(body.quantity.unwrap_or(1))?;
    let mut ctx = shopper.lock().await;
    require_user(&ctx)?;

    let product_id = ProductId::new(body.product_id);
    // The merged line is bounded too, not only the increment.
    checked_quantity(ctx.cart.items().quantity_of(&product_id).saturating_add(quantity))?;

    let product = state.catalog().fetch_product_by_id(&product_id).await?;
    ctx.cart.add_to_cart(&product, quantity).await?;
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product.id.as_str())]));
    Ok(Json(CartView::from(&ctx.cart)))
}

/// `PATCH /api/cart/items/{product_id}`
pub async fn update(
    shopper: Shopper,
    Path(product_id): Path<String>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let quantity = checked_quantity(body.quantity)?;
    let mut ctx = shopper.lock().await;
    require_user(&ctx)?;

    ctx.cart
        .update_quantity(&ProductId::new(product_id), quantity)
        .await?;
    Ok(Json(CartView::from(&ctx.cart)))
}

/// `DELETE /api/cart/items/{product_id}`
pub async fn remove(shopper: Shopper, Path(product_id): Path<String>) -> Result<Json<CartView>> {
    let mut ctx = shopper.lock().await;
    require_user(&ctx)?;

    ctx.cart.remove_from_cart(&ProductId::new(product_id)).await?;
    Ok(Json(CartView::from(&ctx.cart)))
}

/// `DELETE /api/cart`
pub async fn clear(shopper: Shopper) -> Result<Json<CartView>> {
    let mut ctx = shopper.lock().await;
    require_user(&ctx)?;

    ctx.cart.clear_cart().await?;
    Ok(Json(CartView::from(&ctx.cart)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_below_one_is_rejected() {
        assert_eq!(checked_quantity(0), Err(ValidationError::Quantity(0)));
        assert_eq!(checked_quantity(-2), Err(ValidationError::Quantity(-2)));
        assert_eq!(checked_quantity(3), Ok(3));
    }

    #[test]
    fn test_quantity_above_cap_is_rejected() {
        assert_eq!(checked_quantity(MAX_QUANTITY), Ok(MAX_QUANTITY));
        assert_eq!(
            checked_quantity(MAX_QUANTITY + 1),
            Err(ValidationError::Quantity(MAX_QUANTITY + 1))
        );
        assert_eq!(
            checked_quantity(i64::MAX),
            Err(ValidationError::Quantity(i64::MAX))
        );
    }
}
