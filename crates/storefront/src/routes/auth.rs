//! Authentication route handlers.
//!
//! Sign-in state lives in the caller's session context; these handlers copy
//! the resulting tokens into the HTTP session so a fresh context can be
//! resolved after expiry or a restart.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use emporium_core::backend::Identity;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::Shopper;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// The signed-in user as shown to the client.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub uid: String,
    pub email: Option<String>,
    /// Display hint; privileged calls are re-checked server-side.
    pub admin: bool,
}

impl From<&Identity> for UserView {
    fn from(identity: &Identity) -> Self {
        Self {
            uid: identity.uid.to_string(),
            email: identity.email.as_ref().map(ToString::to_string),
            admin: identity.claims.is_admin(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub user: Option<UserView>,
}

/// `POST /api/auth/login`
pub async fn login(shopper: Shopper, Json(body): Json<LoginRequest>) -> Result<Json<UserView>> {
    let mut ctx = shopper.lock().await;
    let result = ctx.login(&body.email, &body.password).await;
    if result.is_ok() {
        shopper.cycle_id().await?;
    }
    shopper.store_identity(&ctx).await?;

    let identity = result?;
    add_breadcrumb("auth", "Signed in", None);
    Ok(Json(UserView::from(&identity)))
}

/// `POST /api/auth/register`
///
/// Creates the account without signing in.
pub async fn register(
    shopper: Shopper,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>)> {
    let ctx = shopper.lock().await;
    let identity = ctx
        .auth
        .register(&body.email, &body.password, &body.password_confirm)
        .await?;
    Ok((StatusCode::CREATED, Json(UserView::from(&identity))))
}

/// `POST /api/auth/logout`
pub async fn logout(shopper: Shopper) -> Result<StatusCode> {
    let mut ctx = shopper.lock().await;
    ctx.logout().await;
    shopper.store_identity(&ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`
pub async fn me(shopper: Shopper) -> Json<MeResponse> {
    let ctx = shopper.lock().await;
    let user = ctx.auth.user();
    Json(MeResponse {
        authenticated: user.is_some(),
        user: user.as_ref().map(UserView::from),
    })
}
