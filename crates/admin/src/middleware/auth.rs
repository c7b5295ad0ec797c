//! Bearer token verification.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use emporium_core::backend::{BackendError, Identity};

use crate::error::AppError;
use crate::state::AppState;

/// A caller whose ID token was just verified with the identity service and
/// whose current claims grant admin access.
///
/// Claims are read from the service, not from the token, so a demoted admin
/// is refused even while holding an unexpired token.
pub struct VerifiedAdmin(pub Identity);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for VerifiedAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::MissingToken)?;

        let identity = state.identity().verify(token).await.map_err(|e| match e {
            BackendError::InvalidToken(_) | BackendError::NotFound(_) => AppError::InvalidToken(e),
            other => AppError::Backend(other),
        })?;

        if !identity.claims.is_admin() {
            tracing::warn!(uid = %identity.uid, "Non-admin caller refused");
            return Err(AppError::Forbidden);
        }

        sentry::configure_scope(|scope| {
            scope.set_user(Some(sentry::User {
                id: Some(identity.uid.to_string()),
                ..Default::default()
            }));
        });
        Ok(Self(identity))
    }
}
