//! Threaded comments on catalog items.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use empire_core::catalog::ItemType;
use empire_core::comments::{Forest, build_forest, reply_depth};
use empire_core::validation;

use super::error::ApiError;
use super::{AppState, success};
use crate::policy::{Session, require_active, require_admin};
use crate::storage::{Comment, DatabaseError, NewComment};

#[derive(Debug, Default, Deserialize)]
pub struct ListCommentsParams {
    pub item_id: Option<String>,
    pub item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub item_id: String,
    pub item_type: String,
    pub content: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: Comment,
}

fn required_param(name: &str, raw: Option<String>) -> Result<String, ApiError> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{name} is required")))
}

/// `GET /api/comments?item_id=&item_type=`
///
/// Every comment on the subject as a forest: roots and replies in creation
/// order, `total` counting all of them.
#[instrument(skip(state, params), fields(route = "list_comments"))]
pub async fn list_comments(
    State(state): State<AppState>,
    params: Result<Query<ListCommentsParams>, QueryRejection>,
) -> Result<Json<Forest<Comment>>, ApiError> {
    let Query(params) = params?;
    let item_id = required_param("item_id", params.item_id)?;
    let item_type: ItemType = required_param("item_type", params.item_type)?.parse()?;

    let rows = state.db.list_comments(&item_id, item_type).await?;
    Ok(Json(build_forest(rows)))
}

/// `POST /api/comments`
#[instrument(skip(state, body), fields(route = "create_comment", user_id = %session.user_id))]
pub async fn create_comment(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let author = require_active(&state.db, &session).await?;
    let Json(req) = body?;

    let item_type: ItemType = req.item_type.parse()?;
    let max_chars = state.config.storefront.comment_max_chars;
    let content = validation::comment_body(&req.content, max_chars)?;
    let item_id = required_param("item_id", Some(req.item_id))?;

    if !state.db.item_exists(&item_id, item_type).await? {
        return Err(ApiError::not_found(format!("{item_type} {item_id} not found")));
    }

    let parent_id = req
        .parent_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if let Some(parent_id) = &parent_id {
        let parent = state.db.get_comment(parent_id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => ApiError::not_found("Parent comment not found"),
            other => other.into(),
        })?;
        if parent.item_id != item_id || parent.item_type != item_type {
            return Err(ApiError::validation("Parent comment belongs to a different item"));
        }
        reply_depth(parent.depth)?;
    }

    let id = uuid::Uuid::new_v4().to_string();
    let comment = state
        .db
        .create_comment(
            &id,
            &NewComment {
                item_id,
                item_type,
                user_id: author.id,
                parent_id,
                content,
            },
        )
        .await?;

    info!(
        comment_id = %comment.id,
        item_id = %comment.item_id,
        item_type = %comment.item_type,
        reply = comment.parent_id.is_some(),
        "Comment created"
    );
    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

/// `DELETE /api/comments/{id}`
///
/// Removes the comment and every reply beneath it.
#[instrument(skip(state), fields(route = "delete_comment", user_id = %session.user_id))]
pub async fn delete_comment(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state.db, &session).await?;
    if !state.db.delete_comment(&id).await? {
        return Err(ApiError::not_found(format!("Comment {id} not found")));
    }
    info!(comment_id = %id, "Comment deleted");
    Ok(success())
}
