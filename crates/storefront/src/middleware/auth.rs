//! Session context extractor.
//!
//! [`Shopper`] finds (or creates) the [`SessionContext`] belonging to the
//! request's session cookie. A new context is resolved from the tokens kept
//! in the session before the handler sees it, so handlers never observe the
//! `Unknown` auth state.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tokio::sync::{Mutex, MutexGuard};
use tower_sessions::Session;
use uuid::Uuid;

use emporium_core::backend::{Identity, IdentitySession};

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::session_keys;
use crate::services::SessionContext;
use crate::state::AppState;

/// The caller's session and its live context.
pub struct Shopper {
    session: Session,
    context: Arc<Mutex<SessionContext>>,
}

impl FromRequestParts<AppState> for Shopper {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let context_id = match session.get::<Uuid>(session_keys::CONTEXT_ID).await? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session.insert(session_keys::CONTEXT_ID, id).await?;
                id
            }
        };

        let context = state.contexts().get_or_create(context_id).await;
        let shopper = Self { session, context };
        {
            let mut ctx = shopper.context.lock().await;
            if !ctx.is_resolved() {
                let stored = shopper
                    .session
                    .get::<IdentitySession>(session_keys::IDENTITY)
                    .await?;
                ctx.resolve(stored).await;
                shopper.store_identity(&ctx).await?;
            }
        }
        Ok(shopper)
    }
}

impl Shopper {
    /// Lock the context for the rest of the request.
    pub async fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.context.lock().await
    }

    /// Copy the context's current tokens into the session.
    ///
    /// Call after anything that signs in or out.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn store_identity(&self, ctx: &SessionContext) -> Result<(), AppError> {
        match ctx.auth.tokens() {
            Some(tokens) => {
                self.session.insert(session_keys::IDENTITY, tokens).await?;
                set_sentry_user(
                    &tokens.identity.uid,
                    tokens.identity.email.as_ref().map(emporium_core::Email::as_str),
                );
            }
            None => {
                self.session
                    .remove::<IdentitySession>(session_keys::IDENTITY)
                    .await?;
                clear_sentry_user();
            }
        }
        Ok(())
    }

    /// Rotate the session id after a privilege change.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn cycle_id(&self) -> Result<(), AppError> {
        self.session.cycle_id().await?;
        Ok(())
    }
}

/// The signed-in identity of a locked context, or 401.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when nobody is signed in.
pub fn require_user(ctx: &SessionContext) -> Result<Identity, AppError> {
    ctx.auth
        .user()
        .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
}
