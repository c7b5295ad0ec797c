//! Order handler.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::Value;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{Shopper, require_user};
use crate::routes::admin::CreatedResponse;
use crate::state::AppState;

/// `POST /api/orders`
///
/// Records the payload as-is. Checkout and payment happen elsewhere.
pub async fn create(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let user = {
        let ctx = shopper.lock().await;
        require_user(&ctx)?
    };
    let id = state.orders().create_order(&user, payload).await?;
    add_breadcrumb("orders", "Order recorded", Some(&[("order_id", id.as_str())]));
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: id.into_inner(),
        }),
    ))
}
