//! Promotion management, validation against an order, and redemption.
//!
//! Every promotion in a response carries a `status` derived from its dates
//! at the time of the request.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use empire_core::db::unix_timestamp;
use empire_core::promotion::PromotionStatus;
use empire_core::validation;

use super::error::ApiError;
use super::{AppState, success};
use crate::policy::{Session, require_active, require_admin};
use crate::storage::{DatabaseError, PromotionParams, PromotionView};

const NAME_MAX_CHARS: usize = 200;
const DESCRIPTION_MAX_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct PromotionRequest {
    pub code: String,
    pub name_vi: String,
    pub name_en: String,
    pub description_vi: Option<String>,
    pub description_en: Option<String>,
    pub discount_percent: i64,
    pub max_discount_amount: Option<f64>,
    pub min_order_amount: Option<f64>,
    pub start_date: i64,
    pub end_date: i64,
    pub usage_limit: Option<i64>,
}

fn optional_description(field: &str, raw: Option<String>) -> Result<Option<String>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|d| validation::required_text(field, &d, DESCRIPTION_MAX_CHARS))
        .transpose()
        .map_err(Into::into)
}

fn optional_money(field: &str, raw: Option<f64>) -> Result<Option<f64>, ApiError> {
    raw.map(|v| validation::money(field, v))
        .transpose()
        .map_err(Into::into)
}

impl PromotionRequest {
    fn into_params(self) -> Result<PromotionParams, ApiError> {
        if !(1..=100).contains(&self.discount_percent) {
            return Err(ApiError::validation(
                "discount_percent must be between 1 and 100",
            ));
        }
        if self.end_date < self.start_date {
            return Err(ApiError::validation("end_date must not be before start_date"));
        }
        if self.usage_limit.is_some_and(|limit| limit < 1) {
            return Err(ApiError::validation("usage_limit must be at least 1"));
        }

        Ok(PromotionParams {
            code: validation::promotion_code(&self.code)?,
            name_vi: validation::required_text("name_vi", &self.name_vi, NAME_MAX_CHARS)?,
            name_en: validation::required_text("name_en", &self.name_en, NAME_MAX_CHARS)?,
            description_vi: optional_description("description_vi", self.description_vi)?,
            description_en: optional_description("description_en", self.description_en)?,
            discount_percent: self.discount_percent,
            max_discount_amount: optional_money("max_discount_amount", self.max_discount_amount)?,
            min_order_amount: optional_money("min_order_amount", self.min_order_amount)?,
            start_date: self.start_date,
            end_date: self.end_date,
            usage_limit: self.usage_limit,
        })
    }
}

fn code_taken(e: DatabaseError) -> ApiError {
    match e {
        DatabaseError::Conflict(_) => ApiError::Conflict("Promotion code already exists".into()),
        other => other.into(),
    }
}

#[derive(Debug, Serialize)]
pub struct PromotionsResponse {
    pub promotions: Vec<PromotionView>,
}

#[derive(Debug, Serialize)]
pub struct PromotionResponse {
    pub promotion: PromotionView,
}

/// `GET /api/promotions`
#[instrument(skip(state), fields(route = "list_promotions", user_id = %session.user_id))]
pub async fn list_promotions(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<PromotionsResponse>, ApiError> {
    require_admin(&state.db, &session).await?;
    let now = unix_timestamp();
    let promotions = state
        .db
        .list_promotions()
        .await?
        .into_iter()
        .map(|p| p.at(now))
        .collect();
    Ok(Json(PromotionsResponse { promotions }))
}

/// `POST /api/promotions`
#[instrument(skip(state, body), fields(route = "create_promotion", user_id = %session.user_id))]
pub async fn create_promotion(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<PromotionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PromotionResponse>), ApiError> {
    require_admin(&state.db, &session).await?;
    let Json(req) = body?;
    let params = req.into_params()?;

    let id = uuid::Uuid::new_v4().to_string();
    let promotion = state
        .db
        .create_promotion(&id, &params)
        .await
        .map_err(code_taken)?;
    info!(promotion_id = %id, code = %promotion.code, "Promotion created");

    Ok((
        StatusCode::CREATED,
        Json(PromotionResponse {
            promotion: promotion.at(unix_timestamp()),
        }),
    ))
}

/// `PUT /api/promotions/{id}`
#[instrument(skip(state, body), fields(route = "update_promotion", user_id = %session.user_id))]
pub async fn update_promotion(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PromotionRequest>, JsonRejection>,
) -> Result<Json<PromotionResponse>, ApiError> {
    require_admin(&state.db, &session).await?;
    let Json(req) = body?;
    let params = req.into_params()?;

    let promotion = state
        .db
        .update_promotion(&id, &params)
        .await
        .map_err(code_taken)?;
    info!(promotion_id = %id, code = %promotion.code, "Promotion updated");

    Ok(Json(PromotionResponse {
        promotion: promotion.at(unix_timestamp()),
    }))
}

/// `DELETE /api/promotions/{id}`
#[instrument(skip(state), fields(route = "delete_promotion", user_id = %session.user_id))]
pub async fn delete_promotion(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state.db, &session).await?;
    if !state.db.delete_promotion(&id).await? {
        return Err(ApiError::not_found(format!("Promotion {id} not found")));
    }
    info!(promotion_id = %id, "Promotion deleted");
    Ok(success())
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    pub order_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub promotion: PromotionView,
    pub discount_amount: f64,
    pub final_amount: f64,
}

/// Normalise a code as typed by a shopper. Malformed codes cannot exist, so
/// they are reported as unknown.
fn lookup_code(raw: &str) -> Result<String, ApiError> {
    validation::promotion_code(raw).map_err(|_| ApiError::not_found("Promotion not found"))
}

/// `POST /api/promotions/validate`
///
/// Price an order with a promotion without consuming a use.
#[instrument(skip(state, body), fields(route = "validate_promotion", user_id = %session.user_id))]
pub async fn validate_promotion(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    require_active(&state.db, &session).await?;
    let Json(req) = body?;
    let code = lookup_code(&req.code)?;

    let promotion = state
        .db
        .get_promotion_by_code(&code)
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(_) => ApiError::not_found("Promotion not found"),
            other => other.into(),
        })?;

    let now = unix_timestamp();
    let discount = promotion.terms().evaluate(req.order_amount, now)?;

    Ok(Json(ValidateResponse {
        promotion: promotion.at(now),
        discount_amount: discount.discount_amount,
        final_amount: discount.final_amount,
    }))
}

/// `POST /api/promotions/redeem/{code}`
///
/// Consume one use. The increment and the window/limit check are a single
/// statement, so concurrent redemptions cannot exceed the limit.
#[instrument(skip(state), fields(route = "redeem_promotion", user_id = %session.user_id))]
pub async fn redeem_promotion(
    session: Session,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PromotionResponse>, ApiError> {
    require_active(&state.db, &session).await?;
    let code = lookup_code(&code)?;
    let now = unix_timestamp();

    if let Some(promotion) = state.db.redeem_promotion(&code, now).await? {
        info!(code = %code, used_count = promotion.used_count, "Promotion redeemed");
        return Ok(Json(PromotionResponse {
            promotion: promotion.at(now),
        }));
    }

    // Refused: explain why.
    let promotion = state
        .db
        .get_promotion_by_code(&code)
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(_) => ApiError::not_found("Promotion not found"),
            other => other.into(),
        })?;
    warn!(code = %code, "Promotion redemption refused");
    let terms = promotion.terms();
    let reason = match terms.status(now) {
        PromotionStatus::Scheduled => "Promotion has not started yet",
        PromotionStatus::Expired => "Promotion has expired",
        PromotionStatus::Active if terms.is_exhausted() => "Promotion usage limit reached",
        PromotionStatus::Active => "Promotion cannot be redeemed right now",
    };
    Err(ApiError::validation(reason))
}
