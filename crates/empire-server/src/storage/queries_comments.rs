//! Comment queries. Rows always come back joined with the author's profile.

use empire_core::catalog::ItemType;
use empire_core::db::unix_timestamp;

use super::db::{DatabaseError, StoreDatabase};
use super::models::Comment;

const SELECT_WITH_AUTHOR: &str = "SELECT c.id, c.item_id, c.item_type, c.user_id, c.parent_id, c.content, \
     c.depth, c.created_at, c.updated_at, p.full_name, p.avatar_url, p.role \
     FROM comments c JOIN profiles p ON p.id = c.user_id";

#[derive(Debug, Clone)]
pub struct NewComment {
    pub item_id: String,
    pub item_type: ItemType,
    pub user_id: String,
    pub parent_id: Option<String>,
    pub content: String,
}

impl StoreDatabase {
    /// Insert a comment. Its depth is taken from the parent row, so callers
    /// check the depth cap against [`Comment::depth`] of the parent first.
    pub async fn create_comment(
        &self,
        id: &str,
        comment: &NewComment,
    ) -> Result<Comment, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO comments (id, item_id, item_type, user_id, parent_id, content, depth, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, COALESCE((SELECT depth + 1 FROM comments WHERE id = ?), 0), ?, ?)",
        )
        .bind(id)
        .bind(&comment.item_id)
        .bind(comment.item_type)
        .bind(&comment.user_id)
        .bind(&comment.parent_id)
        .bind(&comment.content)
        .bind(&comment.parent_id)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_comment(id).await
    }

    pub async fn get_comment(&self, id: &str) -> Result<Comment, DatabaseError> {
        sqlx::query_as::<_, Comment>(&format!("{SELECT_WITH_AUTHOR} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Comment {id}")))
    }

    /// Every comment on a subject, oldest first.
    pub async fn list_comments(
        &self,
        item_id: &str,
        item_type: ItemType,
    ) -> Result<Vec<Comment>, DatabaseError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{SELECT_WITH_AUTHOR} WHERE c.item_id = ? AND c.item_type = ? ORDER BY c.created_at, c.rowid"
        ))
        .bind(item_id)
        .bind(item_type)
        .fetch_all(self.pool())
        .await?;
        Ok(comments)
    }

    /// Delete a comment. Its replies go with it (`ON DELETE CASCADE`); the
    /// reply depth cap keeps the cascade shallow.
    pub async fn delete_comment(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
