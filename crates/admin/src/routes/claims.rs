//! `POST /api/admin`: promote or demote a user.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use emporium_core::Uid;

use crate::error::{AppError, Result};
use crate::middleware::VerifiedAdmin;
use crate::services::{ClaimAction, apply_claim_action};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ClaimRequest {
    pub action: Option<String>,
    pub uid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn required(value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing params".to_string()))
}

pub async fn update_claims(
    State(state): State<AppState>,
    VerifiedAdmin(caller): VerifiedAdmin,
    Json(body): Json<ClaimRequest>,
) -> Result<Json<MessageResponse>> {
    let action = required(body.action)?;
    let uid = Uid::new(required(body.uid)?);
    let action: ClaimAction = action
        .parse()
        .map_err(|_| AppError::BadRequest("Unknown action".to_string()))?;

    tracing::info!(caller = %caller.uid, target = %uid, %action, "Claim change requested");
    apply_claim_action(state.identity(), &uid, action).await?;

    Ok(Json(MessageResponse {
        message: match action {
            ClaimAction::Promote => "User promoted",
            ClaimAction::Demote => "User demoted",
        },
    }))
}
