//! Liveness endpoint for load balancers and uptime checks.

use axum::Json;
use serde_json::{Value, json};

/// `GET /health`
///
/// If this handler runs, the server is alive and accepting requests. It does
/// not touch the database.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
