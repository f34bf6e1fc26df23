//! HTTP API for the storefront.
//!
//! One module per resource; every handler goes through [`crate::policy`] for
//! authentication and role checks and returns [`error::ApiError`] on failure.

pub mod admin_svc;
pub mod auth_svc;
pub mod cart_svc;
pub mod catalog_svc;
pub mod comment_svc;
pub mod error;
pub mod health;
pub mod profile_svc;
pub mod promotion_svc;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{delete, get, patch, post, put};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use empire_core::StoreConfig;

use crate::auth::JwtManager;
use crate::storage::StoreDatabase;

pub use error::ApiError;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: StoreDatabase,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<StoreConfig>,
    /// Accounts registering with this email are created as admins.
    pub admin_email: Option<String>,
}

impl AppState {
    pub fn new(db: StoreDatabase, jwt: JwtManager, config: StoreConfig) -> Self {
        Self {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
            admin_email: None,
        }
    }

    #[must_use]
    pub fn with_admin_email(mut self, email: Option<String>) -> Self {
        self.admin_email = email.map(|e| e.trim().to_ascii_lowercase());
        self
    }
}

/// Build the full API router with tracing, body-size and timeout layers.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_bytes;
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth_svc::register))
        .route("/api/auth/login", post(auth_svc::login))
        .route(
            "/api/profile",
            get(profile_svc::get_profile).patch(profile_svc::update_profile),
        )
        .route("/api/admin/users", get(admin_svc::list_users))
        .route("/api/admin/users/{id}", patch(admin_svc::update_user))
        .route(
            "/api/categories",
            get(catalog_svc::list_categories).post(catalog_svc::create_category),
        )
        .route(
            "/api/categories/{id}",
            put(catalog_svc::update_category).delete(catalog_svc::delete_category),
        )
        .route(
            "/api/accounts",
            get(catalog_svc::list_accounts).post(catalog_svc::create_account),
        )
        .route(
            "/api/accounts/{id}",
            get(catalog_svc::get_account)
                .put(catalog_svc::update_account)
                .delete(catalog_svc::delete_account),
        )
        .route(
            "/api/courses",
            get(catalog_svc::list_courses).post(catalog_svc::create_course),
        )
        .route(
            "/api/courses/{id}",
            get(catalog_svc::get_course)
                .put(catalog_svc::update_course)
                .delete(catalog_svc::delete_course),
        )
        .route(
            "/api/promotions",
            get(promotion_svc::list_promotions).post(promotion_svc::create_promotion),
        )
        .route("/api/promotions/validate", post(promotion_svc::validate_promotion))
        .route(
            "/api/promotions/{id}",
            put(promotion_svc::update_promotion).delete(promotion_svc::delete_promotion),
        )
        .route("/api/promotions/redeem/{code}", post(promotion_svc::redeem_promotion))
        .route("/api/cart", get(cart_svc::get_cart))
        .route("/api/cart/items", post(cart_svc::add_item))
        .route(
            "/api/cart/items/{id}",
            patch(cart_svc::update_item).delete(cart_svc::remove_item),
        )
        .route(
            "/api/comments",
            get(comment_svc::list_comments).post(comment_svc::create_comment),
        )
        .route("/api/comments/{id}", delete(comment_svc::delete_comment))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(timeout_layer(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Requests still running after `timeout` are answered with 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// CORS for a single browser origin (the storefront front end).
pub fn cors_layer(origin: &str) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}

/// `{"success": true}`, returned by delete endpoints.
pub(crate) fn success() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "success": true }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn slow_request_times_out_with_408() {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(timeout_layer(Duration::from_millis(20)));

        let resp = router
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
