//! Promotion queries.

use empire_core::db::unix_timestamp;

use super::db::{DatabaseError, StoreDatabase};
use super::models::Promotion;

#[derive(Debug, Clone)]
pub struct PromotionParams {
    /// Already upper-cased.
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

impl StoreDatabase {
    pub async fn create_promotion(
        &self,
        id: &str,
        params: &PromotionParams,
    ) -> Result<Promotion, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO promotions (id, code, name_vi, name_en, description_vi, description_en, discount_percent, max_discount_amount, min_order_amount, start_date, end_date, usage_limit, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&params.code)
        .bind(&params.name_vi)
        .bind(&params.name_en)
        .bind(&params.description_vi)
        .bind(&params.description_en)
        .bind(params.discount_percent)
        .bind(params.max_discount_amount)
        .bind(params.min_order_amount)
        .bind(params.start_date)
        .bind(params.end_date)
        .bind(params.usage_limit)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_promotion(id).await
    }

    pub async fn get_promotion(&self, id: &str) -> Result<Promotion, DatabaseError> {
        sqlx::query_as::<_, Promotion>("SELECT * FROM promotions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Promotion {id}")))
    }

    pub async fn get_promotion_by_code(&self, code: &str) -> Result<Promotion, DatabaseError> {
        sqlx::query_as::<_, Promotion>("SELECT * FROM promotions WHERE code = ?")
            .bind(code)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Promotion {code}")))
    }

    /// List promotions, latest start date first.
    pub async fn list_promotions(&self) -> Result<Vec<Promotion>, DatabaseError> {
        let promotions = sqlx::query_as::<_, Promotion>(
            "SELECT * FROM promotions ORDER BY start_date DESC, rowid DESC",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(promotions)
    }

    pub async fn update_promotion(
        &self,
        id: &str,
        params: &PromotionParams,
    ) -> Result<Promotion, DatabaseError> {
        let result = sqlx::query(
            "UPDATE promotions SET code = ?, name_vi = ?, name_en = ?, description_vi = ?, description_en = ?, discount_percent = ?, \
             max_discount_amount = ?, min_order_amount = ?, start_date = ?, end_date = ?, usage_limit = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&params.code)
        .bind(&params.name_vi)
        .bind(&params.name_en)
        .bind(&params.description_vi)
        .bind(&params.description_en)
        .bind(params.discount_percent)
        .bind(params.max_discount_amount)
        .bind(params.min_order_amount)
        .bind(params.start_date)
        .bind(params.end_date)
        .bind(params.usage_limit)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Promotion {id}")));
        }
        self.get_promotion(id).await
    }

    pub async fn delete_promotion(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM promotions WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count one use of a promotion, only while it is in its window and
    /// under its usage limit. Returns `None` when the use was refused.
    pub async fn redeem_promotion(
        &self,
        code: &str,
        now: i64,
    ) -> Result<Option<Promotion>, DatabaseError> {
        let promotion = sqlx::query_as::<_, Promotion>(
            "UPDATE promotions SET used_count = used_count + 1, updated_at = ? \
             WHERE code = ? AND start_date <= ? AND end_date >= ? \
               AND (usage_limit IS NULL OR used_count < usage_limit) \
             RETURNING *",
        )
        .bind(now)
        .bind(code)
        .bind(now)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;
        Ok(promotion)
    }
}
