//! Access policy shared by every handler.
//!
//! Authentication happens in the [`Session`] extractor, before any database
//! access. Authorisation is re-checked per request against the caller's
//! current profile, so a role change or ban applies to tokens already issued.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;

use crate::server::AppState;
use crate::server::error::ApiError;
use crate::storage::{DatabaseError, Profile, StoreDatabase};

/// An authenticated caller, taken from a valid `Bearer` access token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let claims = state
            .jwt
            .validate(token)
            .map_err(|_| ApiError::unauthorized("Invalid token"))?;

        if !claims.is_access() {
            return Err(ApiError::unauthorized("Not an access token"));
        }

        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

/// `Option<Session>`: no `Authorization` header is anonymous, a bad one is
/// still rejected.
impl OptionalFromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }
        <Self as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

/// Load the caller's profile, refusing callers without one or banned ones.
pub async fn require_active(db: &StoreDatabase, session: &Session) -> Result<Profile, ApiError> {
    let profile = db.get_profile(&session.user_id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => {
            warn!(user_id = %session.user_id, "Token for unknown profile");
            ApiError::forbidden("Profile not found")
        }
        other => ApiError::from(other),
    })?;

    if profile.is_banned() {
        warn!(user_id = %session.user_id, "Banned user denied");
        return Err(ApiError::forbidden("Account is banned"));
    }
    Ok(profile)
}

/// Like [`require_active`], and additionally require the admin role.
pub async fn require_admin(db: &StoreDatabase, session: &Session) -> Result<Profile, ApiError> {
    let profile = require_active(db, session).await?;
    if !profile.is_admin() {
        warn!(user_id = %session.user_id, "Non-admin denied admin operation");
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(profile)
}

/// Verify the caller owns a resource whose owner is `owner_id`.
pub fn ensure_owner(owner_id: &str, session: &Session) -> Result<(), ApiError> {
    if owner_id != session.user_id {
        warn!(user_id = %session.user_id, "Caller does not own resource");
        return Err(ApiError::forbidden("Not your resource"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{ProfileChanges, ProfileStatus, Role};

    fn session(user_id: &str) -> Session {
        Session {
            user_id: user_id.into(),
            email: format!("{user_id}@example.com"),
        }
    }

    async fn db_with(role: Role) -> StoreDatabase {
        let db = StoreDatabase::open_in_memory().await.unwrap();
        db.create_user("u1", "u1@example.com", "hash", "User One", role)
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn admin_passes_admin_check() {
        let db = db_with(Role::Admin).await;
        let profile = require_admin(&db, &session("u1")).await.unwrap();
        assert!(profile.is_admin());
    }

    #[tokio::test]
    async fn user_fails_admin_check() {
        let db = db_with(Role::User).await;
        let err = require_admin(&db, &session("u1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(require_active(&db, &session("u1")).await.is_ok());
    }

    #[tokio::test]
    async fn missing_profile_is_forbidden() {
        let db = db_with(Role::Admin).await;
        let err = require_active(&db, &session("ghost")).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn banned_admin_is_forbidden() {
        let db = db_with(Role::Admin).await;
        db.update_profile(
            "u1",
            ProfileChanges {
                status: Some(ProfileStatus::Banned),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let err = require_admin(&db, &session("u1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn ownership() {
        assert!(ensure_owner("u1", &session("u1")).is_ok());
        assert!(matches!(
            ensure_owner("u2", &session("u1")),
            Err(ApiError::Forbidden(_))
        ));
    }
}
