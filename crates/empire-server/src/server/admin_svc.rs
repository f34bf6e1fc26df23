//! Admin back office: user listing and role/status management.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::AppState;
use super::error::ApiError;
use super::profile_svc::ProfileResponse;
use crate::policy::{Session, require_admin};
use crate::storage::{Profile, ProfileChanges, ProfileStatus, Role};

#[derive(Debug, Serialize)]
pub struct ProfilesResponse {
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    pub status: Option<ProfileStatus>,
}

/// `GET /api/admin/users`
#[instrument(skip(state), fields(route = "list_users", user_id = %session.user_id))]
pub async fn list_users(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<ProfilesResponse>, ApiError> {
    require_admin(&state.db, &session).await?;
    let profiles = state.db.list_profiles().await?;
    Ok(Json(ProfilesResponse { profiles }))
}

/// `PATCH /api/admin/users/{id}`
#[instrument(skip(state, body), fields(route = "update_user", user_id = %session.user_id))]
pub async fn update_user(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let admin = require_admin(&state.db, &session).await?;
    let Json(req) = body?;

    if req.role.is_none() && req.status.is_none() {
        return Err(ApiError::validation("Nothing to update: give role or status"));
    }
    // Self-demotion and self-ban are refused.
    if admin.id == id {
        return Err(ApiError::validation(
            "Admins cannot change their own role or status",
        ));
    }

    let profile = state
        .db
        .update_profile(
            &id,
            ProfileChanges {
                role: req.role,
                status: req.status,
                ..Default::default()
            },
        )
        .await?;

    info!(
        target_user = %profile.id,
        role = ?profile.role,
        status = ?profile.status,
        "User updated by admin"
    );
    Ok(Json(ProfileResponse { profile }))
}
