//! Catalog endpoints: categories, account listings and courses.
//!
//! Reads are public. Writes need an admin. Inactive listings are hidden
//! unless an admin asks for them with `include_inactive=true`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use empire_core::catalog::{ListingQuery, PriceRange};
use empire_core::pricing::{Currency, min_price};
use empire_core::validation;

use super::error::ApiError;
use super::{AppState, success};
use crate::policy::{Session, require_admin};
use crate::storage::{
    AccountListing, AccountParams, Category, CategoryParams, Course, CourseParams, DatabaseError,
    StoreDatabase, VariantParams,
};

const NAME_MAX_CHARS: usize = 200;
const DESCRIPTION_MAX_CHARS: usize = 5000;

/// Query string accepted by the account and course lists.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ListParams {
    fn currency(&self, fallback: Currency) -> Result<Currency, ApiError> {
        match self.currency.as_deref().map(str::trim) {
            None | Some("") => Ok(fallback),
            Some(raw) => Ok(raw.parse()?),
        }
    }

    fn listing_query(&self, fallback: Currency) -> Result<ListingQuery, ApiError> {
        Ok(ListingQuery {
            category: self.category.clone(),
            range: PriceRange::parse(self.min_price.as_deref(), self.max_price.as_deref())?,
            sort: self.sort.as_deref().unwrap_or_default().parse()?,
            currency: self.currency(fallback)?,
        })
    }
}

/// Only admins may see inactive listings.
async fn visibility(
    db: &StoreDatabase,
    session: Option<&Session>,
    include_inactive: bool,
) -> Result<bool, ApiError> {
    if !include_inactive {
        return Ok(false);
    }
    let session =
        session.ok_or_else(|| ApiError::unauthorized("Sign in to see inactive listings"))?;
    require_admin(db, session).await?;
    Ok(true)
}

/// Whether the optional caller is an active admin. Anonymous and non-admin
/// callers are simply not admins here.
async fn caller_is_admin(db: &StoreDatabase, session: Option<&Session>) -> Result<bool, ApiError> {
    let Some(session) = session else {
        return Ok(false);
    };
    match require_admin(db, session).await {
        Ok(_) => Ok(true),
        Err(ApiError::Forbidden(_)) => Ok(false),
        Err(other) => Err(other),
    }
}

fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn image_url(raw: Option<String>) -> Result<Option<String>, ApiError> {
    optional_text(raw)
        .map(|url| validation::http_url("image_url", &url))
        .transpose()
        .map_err(Into::into)
}

fn description(raw: Option<String>) -> Result<Option<String>, ApiError> {
    optional_text(raw)
        .map(|d| validation::required_text("description", &d, DESCRIPTION_MAX_CHARS))
        .transpose()
        .map_err(Into::into)
}

/// Resolve a category id from a request body; unknown ids are a bad request.
async fn category_ref(
    db: &StoreDatabase,
    raw: Option<String>,
) -> Result<Option<String>, ApiError> {
    let Some(id) = optional_text(raw) else {
        return Ok(None);
    };
    match db.get_category(&id).await {
        Ok(category) => Ok(Some(category.id)),
        Err(DatabaseError::NotFound(_)) => Err(ApiError::validation(format!(
            "Category {id} does not exist"
        ))),
        Err(other) => Err(other.into()),
    }
}

// =========================================================================
// Categories
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl CategoryRequest {
    fn into_params(self) -> Result<CategoryParams, ApiError> {
        Ok(CategoryParams {
            name: validation::required_text("name", &self.name, NAME_MAX_CHARS)?,
            slug: validation::slug(&self.slug)?,
            description: description(self.description)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: Category,
}

/// `GET /api/categories`
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = state.db.list_categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}

/// `POST /api/categories`
#[instrument(skip(state, body), fields(route = "create_category", user_id = %session.user_id))]
pub async fn create_category(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    require_admin(&state.db, &session).await?;
    let Json(req) = body?;
    let params = req.into_params()?;

    let id = uuid::Uuid::new_v4().to_string();
    let category = state.db.create_category(&id, &params).await?;
    info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(CategoryResponse { category })))
}

/// `PUT /api/categories/{id}`
#[instrument(skip(state, body), fields(route = "update_category", user_id = %session.user_id))]
pub async fn update_category(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<Json<CategoryResponse>, ApiError> {
    require_admin(&state.db, &session).await?;
    let Json(req) = body?;
    let params = req.into_params()?;

    let category = state.db.update_category(&id, &params).await?;
    info!(category_id = %category.id, "Category updated");
    Ok(Json(CategoryResponse { category }))
}

/// `DELETE /api/categories/{id}`
#[instrument(skip(state), fields(route = "delete_category", user_id = %session.user_id))]
pub async fn delete_category(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state.db, &session).await?;
    if !state.db.delete_category(&id).await? {
        return Err(ApiError::not_found(format!("Category {id} not found")));
    }
    info!(category_id = %id, "Category deleted");
    Ok(success())
}

// =========================================================================
// Account listings
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct VariantRequest {
    /// Set to keep an existing variant (and cart lines pointing at it).
    pub id: Option<String>,
    pub name: String,
    pub price_usd: f64,
    pub price_vnd: f64,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub variants: Vec<VariantRequest>,
}

const fn active_by_default() -> bool {
    true
}

impl AccountRequest {
    async fn into_params(self, db: &StoreDatabase) -> Result<AccountParams, ApiError> {
        let variants = self
            .variants
            .into_iter()
            .map(|v| {
                if v.stock < 0 {
                    return Err(ApiError::validation("stock must not be negative"));
                }
                Ok(VariantParams {
                    id: optional_text(v.id),
                    name: validation::required_text("variant name", &v.name, NAME_MAX_CHARS)?,
                    price_usd: validation::money("price_usd", v.price_usd)?,
                    price_vnd: validation::money("price_vnd", v.price_vnd)?,
                    stock: v.stock,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(AccountParams {
            name: validation::required_text("name", &self.name, NAME_MAX_CHARS)?,
            description: description(self.description)?,
            image_url: image_url(self.image_url)?,
            is_active: self.is_active,
            variants,
            category_id: category_ref(db, self.category_id).await?,
        })
    }
}

/// An account listing with the price of its cheapest variant.
#[derive(Debug, Serialize)]
pub struct AccountView {
    #[serde(flatten)]
    pub listing: AccountListing,
    pub min_price: Option<f64>,
    pub currency: Currency,
}

impl AccountView {
    fn new(listing: AccountListing, currency: Currency) -> Self {
        let min_price = min_price(&listing.variants, currency);
        Self {
            listing,
            min_price,
            currency,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<AccountView>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: AccountView,
}

/// `GET /api/accounts`
#[instrument(skip(state, session, params), fields(route = "list_accounts"))]
pub async fn list_accounts(
    session: Option<Session>,
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<AccountsResponse>, ApiError> {
    let Query(params) = params?;
    let query = params.listing_query(state.config.storefront.default_currency)?;
    let include_inactive = visibility(&state.db, session.as_ref(), params.include_inactive).await?;

    let listings = state.db.list_accounts(include_inactive).await?;
    let accounts = query
        .apply(listings)
        .into_iter()
        .map(|listing| AccountView::new(listing, query.currency))
        .collect();
    Ok(Json(AccountsResponse { accounts }))
}

/// `GET /api/accounts/{id}`
#[instrument(skip(state, session, params), fields(route = "get_account"))]
pub async fn get_account(
    session: Option<Session>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<AccountResponse>, ApiError> {
    let Query(params) = params?;
    let currency = params.currency(state.config.storefront.default_currency)?;

    let listing = state.db.get_account(&id).await?;
    if !listing.account.is_active && !caller_is_admin(&state.db, session.as_ref()).await? {
        return Err(ApiError::not_found(format!("Account {id} not found")));
    }
    Ok(Json(AccountResponse {
        account: AccountView::new(listing, currency),
    }))
}

/// `POST /api/accounts`
#[instrument(skip(state, body), fields(route = "create_account", user_id = %session.user_id))]
pub async fn create_account(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<AccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    require_admin(&state.db, &session).await?;
    let Json(req) = body?;
    let params = req.into_params(&state.db).await?;

    let id = uuid::Uuid::new_v4().to_string();
    let listing = state.db.create_account(&id, &params).await?;
    info!(account_id = %id, variants = listing.variants.len(), "Account listing created");

    let account = AccountView::new(listing, state.config.storefront.default_currency);
    Ok((StatusCode::CREATED, Json(AccountResponse { account })))
}

/// `PUT /api/accounts/{id}`
#[instrument(skip(state, body), fields(route = "update_account", user_id = %session.user_id))]
pub async fn update_account(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<AccountRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, ApiError> {
    require_admin(&state.db, &session).await?;
    let Json(req) = body?;
    let params = req.into_params(&state.db).await?;

    let listing = state.db.update_account(&id, &params).await?;
    info!(account_id = %id, variants = listing.variants.len(), "Account listing updated");

    let account = AccountView::new(listing, state.config.storefront.default_currency);
    Ok(Json(AccountResponse { account }))
}

/// `DELETE /api/accounts/{id}`
#[instrument(skip(state), fields(route = "delete_account", user_id = %session.user_id))]
pub async fn delete_account(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state.db, &session).await?;
    if !state.db.delete_account(&id).await? {
        return Err(ApiError::not_found(format!("Account {id} not found")));
    }
    info!(account_id = %id, "Account listing deleted");
    Ok(success())
}

// =========================================================================
// Courses
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CourseRequest {
    pub category_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub image_url: Option<String>,
    pub price_usd: f64,
    pub price_vnd: f64,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

impl CourseRequest {
    async fn into_params(self, db: &StoreDatabase) -> Result<CourseParams, ApiError> {
        Ok(CourseParams {
            title: validation::required_text("title", &self.title, NAME_MAX_CHARS)?,
            description: description(self.description)?,
            instructor: optional_text(self.instructor)
                .map(|i| validation::required_text("instructor", &i, NAME_MAX_CHARS))
                .transpose()?,
            image_url: image_url(self.image_url)?,
            price_usd: validation::money("price_usd", self.price_usd)?,
            price_vnd: validation::money("price_vnd", self.price_vnd)?,
            is_active: self.is_active,
            category_id: category_ref(db, self.category_id).await?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CoursesResponse {
    pub courses: Vec<Course>,
}

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub course: Course,
}

/// `GET /api/courses`
#[instrument(skip(state, session, params), fields(route = "list_courses"))]
pub async fn list_courses(
    session: Option<Session>,
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<CoursesResponse>, ApiError> {
    let Query(params) = params?;
    let query = params.listing_query(state.config.storefront.default_currency)?;
    let include_inactive = visibility(&state.db, session.as_ref(), params.include_inactive).await?;

    let courses = query.apply(state.db.list_courses(include_inactive).await?);
    Ok(Json(CoursesResponse { courses }))
}

/// `GET /api/courses/{id}`
#[instrument(skip(state, session), fields(route = "get_course"))]
pub async fn get_course(
    session: Option<Session>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = state.db.get_course(&id).await?;
    if !course.is_active && !caller_is_admin(&state.db, session.as_ref()).await? {
        return Err(ApiError::not_found(format!("Course {id} not found")));
    }
    Ok(Json(CourseResponse { course }))
}

/// `POST /api/courses`
#[instrument(skip(state, body), fields(route = "create_course", user_id = %session.user_id))]
pub async fn create_course(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<CourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    require_admin(&state.db, &session).await?;
    let Json(req) = body?;
    let params = req.into_params(&state.db).await?;

    let id = uuid::Uuid::new_v4().to_string();
    let course = state.db.create_course(&id, &params).await?;
    info!(course_id = %id, "Course created");
    Ok((StatusCode::CREATED, Json(CourseResponse { course })))
}

/// `PUT /api/courses/{id}`
#[instrument(skip(state, body), fields(route = "update_course", user_id = %session.user_id))]
pub async fn update_course(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CourseRequest>, JsonRejection>,
) -> Result<Json<CourseResponse>, ApiError> {
    require_admin(&state.db, &session).await?;
    let Json(req) = body?;
    let params = req.into_params(&state.db).await?;

    let course = state.db.update_course(&id, &params).await?;
    info!(course_id = %id, "Course updated");
    Ok(Json(CourseResponse { course }))
}

/// `DELETE /api/courses/{id}`
#[instrument(skip(state), fields(route = "delete_course", user_id = %session.user_id))]
pub async fn delete_course(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state.db, &session).await?;
    if !state.db.delete_course(&id).await? {
        return Err(ApiError::not_found(format!("Course {id} not found")));
    }
    info!(course_id = %id, "Course deleted");
    Ok(success())
}
