//! Registration and login.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use empire_core::validation;

use super::AppState;
use super::error::ApiError;
use crate::auth::password;
use crate::storage::{DatabaseError, Profile, Role};

const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub access_token: String,
    pub expires_in: i64,
    pub profile: Profile,
}

/// `POST /api/auth/register`
#[instrument(skip(state, body), fields(route = "register"))]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(req) = body?;

    let email = validation::email(&req.email)?;
    let full_name = validation::profile_name(&req.full_name)?;
    if req.password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ApiError::validation(format!(
            "Password must be at least {PASSWORD_MIN_CHARS} characters"
        )));
    }

    let hash = password::hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Password hashing failed: {e}")))?;

    let role = if state.admin_email.as_deref() == Some(email.as_str()) {
        Role::Admin
    } else {
        Role::User
    };

    let user_id = uuid::Uuid::new_v4().to_string();
    let profile = state
        .db
        .create_user(&user_id, &email, &hash, &full_name, role)
        .await
        .map_err(|e| match e {
            DatabaseError::Conflict(_) => ApiError::Conflict("Email already registered".into()),
            other => other.into(),
        })?;

    let (access_token, expires_in) = state
        .jwt
        .issue_access_token(&user_id, &email)
        .map_err(|e| ApiError::internal(format!("Token creation failed: {e}")))?;

    info!(user_id = %user_id, role = ?role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            access_token,
            expires_in,
            profile,
        }),
    ))
}

/// `POST /api/auth/login`
#[instrument(skip(state, body), fields(route = "login"))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = body?;
    let email = req.email.trim().to_ascii_lowercase();

    let user = state
        .db
        .get_user_by_email(&email)
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(_) => ApiError::unauthorized("Invalid credentials"),
            other => other.into(),
        })?;

    let valid = password::verify_password(&req.password, &user.password_hash)
        .map_err(|e| ApiError::internal(format!("Password verification failed: {e}")))?;

    if !valid {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let profile = state.db.get_profile(&user.id).await?;
    if profile.is_banned() {
        warn!(user_id = %user.id, "Banned user attempted login");
        return Err(ApiError::forbidden("Account is banned"));
    }

    let (access_token, expires_in) = state
        .jwt
        .issue_access_token(&user.id, &user.email)
        .map_err(|e| ApiError::internal(format!("Token creation failed: {e}")))?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user_id: user.id,
        access_token,
        expires_in,
        profile,
    }))
}
