//! The caller's shopping cart.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use empire_core::catalog::ItemType;

use super::error::ApiError;
use super::{AppState, success};
use crate::policy::{Session, ensure_owner, require_active};
use crate::storage::{CartItem, DatabaseError, MAX_QUANTITY, NewCartItem, StoreDatabase};

fn check_quantity(quantity: i64) -> Result<i64, ApiError> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(ApiError::validation(format!(
            "quantity must be between 1 and {MAX_QUANTITY}"
        )));
    }
    Ok(quantity)
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: String,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: CartView,
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub item: CartItem,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub item_id: String,
    pub item_type: String,
    pub variant_id: Option<String>,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// Check that the item exists and is on sale, and that the variant (if
/// any) belongs to it.
async fn resolve_line(db: &StoreDatabase, req: AddItemRequest) -> Result<NewCartItem, ApiError> {
    let item_type: ItemType = req.item_type.parse()?;
    let quantity = check_quantity(req.quantity)?;
    let variant_id = req
        .variant_id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let not_for_sale = |e: DatabaseError| match e {
        DatabaseError::NotFound(_) => {
            ApiError::not_found(format!("{item_type} {} not found", req.item_id))
        }
        other => other.into(),
    };

    match item_type {
        ItemType::Account => {
            let listing = db.get_account(&req.item_id).await.map_err(not_for_sale)?;
            if !listing.account.is_active {
                return Err(ApiError::not_found(format!("account {} not found", req.item_id)));
            }
            match &variant_id {
                Some(id) if !listing.variants.iter().any(|v| &v.id == id) => {
                    return Err(ApiError::validation(format!(
                        "Variant {id} does not belong to this account"
                    )));
                }
                None if !listing.variants.is_empty() => {
                    return Err(ApiError::validation("variant_id is required for this account"));
                }
                _ => {}
            }
        }
        ItemType::Course => {
            let course = db.get_course(&req.item_id).await.map_err(not_for_sale)?;
            if !course.is_active {
                return Err(ApiError::not_found(format!("course {} not found", req.item_id)));
            }
            if variant_id.is_some() {
                return Err(ApiError::validation("Courses have no variants"));
            }
        }
    }

    Ok(NewCartItem {
        item_id: req.item_id,
        item_type,
        variant_id,
        quantity,
    })
}

/// `GET /api/cart`
///
/// The cart is created on first access.
#[instrument(skip(state), fields(route = "get_cart", user_id = %session.user_id))]
pub async fn get_cart(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<CartResponse>, ApiError> {
    require_active(&state.db, &session).await?;
    let cart = state.db.get_or_create_cart(&session.user_id).await?;
    let items = state.db.list_cart_items(&cart.id).await?;
    Ok(Json(CartResponse {
        cart: CartView { id: cart.id, items },
    }))
}

/// `POST /api/cart/items`
///
/// Adding a line already in the cart increases its quantity, capped at 99.
#[instrument(skip(state, body), fields(route = "add_cart_item", user_id = %session.user_id))]
pub async fn add_item(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartItemResponse>), ApiError> {
    require_active(&state.db, &session).await?;
    let Json(req) = body?;
    let line = resolve_line(&state.db, req).await?;

    let cart = state.db.get_or_create_cart(&session.user_id).await?;
    let item = state.db.add_cart_item(&cart.id, &line).await?;
    info!(cart_item_id = %item.id, quantity = item.quantity, "Cart line added");
    Ok((StatusCode::CREATED, Json(CartItemResponse { item })))
}

/// `PATCH /api/cart/items/{id}`
#[instrument(skip(state, body), fields(route = "update_cart_item", user_id = %session.user_id))]
pub async fn update_item(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<CartItemResponse>, ApiError> {
    require_active(&state.db, &session).await?;
    let owner = state.db.cart_item_owner(&id).await?;
    ensure_owner(&owner, &session)?;

    let Json(req) = body?;
    let quantity = check_quantity(req.quantity)?;
    let item = state.db.set_cart_item_quantity(&id, quantity).await?;
    info!(cart_item_id = %id, quantity, "Cart line updated");
    Ok(Json(CartItemResponse { item }))
}

/// `DELETE /api/cart/items/{id}`
#[instrument(skip(state), fields(route = "remove_cart_item", user_id = %session.user_id))]
pub async fn remove_item(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_active(&state.db, &session).await?;
    let owner = state.db.cart_item_owner(&id).await?;
    ensure_owner(&owner, &session)?;

    state.db.delete_cart_item(&id).await?;
    info!(cart_item_id = %id, "Cart line removed");
    Ok(success())
}
