//! The caller's own profile.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};

use empire_core::validation;

use super::AppState;
use super::error::ApiError;
use crate::policy::{Session, require_active};
use crate::storage::{Profile, ProfileChanges};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    /// Absent leaves the avatar alone; `null` or `""` clears it.
    #[serde(default, deserialize_with = "present")]
    pub avatar_url: Option<Option<String>>,
}

/// Distinguish an explicit `null` from a missing field.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateProfileRequest {
    fn into_changes(self) -> Result<ProfileChanges, ApiError> {
        let full_name = self
            .full_name
            .as_deref()
            .map(validation::profile_name)
            .transpose()?;

        let avatar_url = match self.avatar_url {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.trim().is_empty() => Some(None),
            Some(Some(raw)) => Some(Some(validation::http_url("avatar_url", &raw)?)),
        };

        Ok(ProfileChanges {
            full_name,
            avatar_url,
            ..Default::default()
        })
    }
}

/// `GET /api/profile`
#[instrument(skip(state), fields(route = "get_profile", user_id = %session.user_id))]
pub async fn get_profile(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = require_active(&state.db, &session).await?;
    Ok(Json(ProfileResponse { profile }))
}

/// `PATCH /api/profile`
///
/// Only `full_name` and `avatar_url` are writable here; role and status
/// belong to the admin endpoints.
#[instrument(skip(state, body), fields(route = "update_profile", user_id = %session.user_id))]
pub async fn update_profile(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let current = require_active(&state.db, &session).await?;
    let Json(req) = body?;
    let changes = req.into_changes()?;

    let profile = state.db.update_profile(&current.id, changes).await?;
    info!(user_id = %profile.id, "Profile updated");
    Ok(Json(ProfileResponse { profile }))
}
