//! Catalog queries: categories, account listings with variants, courses.

use std::collections::{HashMap, HashSet};

use empire_core::catalog::ItemType;
use empire_core::db::unix_timestamp;
use sqlx::{Sqlite, Transaction};

use super::db::{DatabaseError, StoreDatabase};
use super::models::{Account, AccountListing, AccountVariant, Category, Course};

#[derive(Debug, Clone)]
pub struct CategoryParams {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VariantParams {
    /// Existing variant to update in place; `None` (or an id this account
    /// does not have) adds a new variant.
    pub id: Option<String>,
    pub name: String,
    pub price_usd: f64,
    pub price_vnd: f64,
    pub stock: i64,
}

#[derive(Debug, Clone)]
pub struct AccountParams {
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    /// The full variant list, in display order. Variants left out are removed.
    pub variants: Vec<VariantParams>,
}

#[derive(Debug, Clone)]
pub struct CourseParams {
    pub category_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub image_url: Option<String>,
    pub price_usd: f64,
    pub price_vnd: f64,
    pub is_active: bool,
}

impl StoreDatabase {
    // =========================================================================
    // Category queries
    // =========================================================================

    pub async fn create_category(
        &self,
        id: &str,
        params: &CategoryParams,
    ) -> Result<Category, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO categories (id, name, slug, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&params.name)
        .bind(&params.slug)
        .bind(&params.description)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_category(id).await
    }

    pub async fn get_category(&self, id: &str) -> Result<Category, DatabaseError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Category {id}")))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(self.pool())
            .await?;
        Ok(categories)
    }

    pub async fn update_category(
        &self,
        id: &str,
        params: &CategoryParams,
    ) -> Result<Category, DatabaseError> {
        let result = sqlx::query(
            "UPDATE categories SET name = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&params.name)
        .bind(&params.slug)
        .bind(&params.description)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Category {id}")));
        }
        self.get_category(id).await
    }

    /// Delete a category. Listings in it become uncategorised.
    pub async fn delete_category(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Account listing queries
    // =========================================================================

    /// Create an account listing together with its variants.
    pub async fn create_account(
        &self,
        id: &str,
        params: &AccountParams,
    ) -> Result<AccountListing, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO accounts (id, category_id, name, description, image_url, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&params.category_id)
        .bind(&params.name)
        .bind(&params.description)
        .bind(&params.image_url)
        .bind(params.is_active)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sync_variants(&mut tx, id, &params.variants).await?;
        tx.commit().await?;

        self.get_account(id).await
    }

    pub async fn get_account(&self, id: &str) -> Result<AccountListing, DatabaseError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account {id}")))?;

        let variants = sqlx::query_as::<_, AccountVariant>(
            "SELECT * FROM account_variants WHERE account_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        Ok(AccountListing { account, variants })
    }

    /// List account listings, newest first, each with its variants.
    pub async fn list_accounts(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<AccountListing>, DatabaseError> {
        let accounts = if include_inactive {
            sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at DESC, rowid DESC")
                .fetch_all(self.pool())
                .await?
        } else {
            sqlx::query_as::<_, Account>(
                "SELECT * FROM accounts WHERE is_active = 1 ORDER BY created_at DESC, rowid DESC",
            )
            .fetch_all(self.pool())
            .await?
        };

        let variants = sqlx::query_as::<_, AccountVariant>(
            "SELECT * FROM account_variants ORDER BY account_id, position",
        )
        .fetch_all(self.pool())
        .await?;

        let mut by_account: HashMap<String, Vec<AccountVariant>> = HashMap::new();
        for variant in variants {
            by_account
                .entry(variant.account_id.clone())
                .or_default()
                .push(variant);
        }

        Ok(accounts
            .into_iter()
            .map(|account| {
                let variants = by_account.remove(&account.id).unwrap_or_default();
                AccountListing { account, variants }
            })
            .collect())
    }

    /// Update an account listing and its variants. Cart lines for variants
    /// that no longer exist are removed in the same transaction.
    pub async fn update_account(
        &self,
        id: &str,
        params: &AccountParams,
    ) -> Result<AccountListing, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE accounts SET category_id = ?, name = ?, description = ?, image_url = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&params.category_id)
        .bind(&params.name)
        .bind(&params.description)
        .bind(&params.image_url)
        .bind(params.is_active)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Account {id}")));
        }

        sync_variants(&mut tx, id, &params.variants).await?;
        sqlx::query(
            "DELETE FROM cart_items WHERE item_type = 'account' AND item_id = ? AND variant_id <> '' \
             AND variant_id NOT IN (SELECT id FROM account_variants WHERE account_id = ?)",
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get_account(id).await
    }

    /// Delete an account listing. Variants cascade; cart lines for it are
    /// removed too.
    pub async fn delete_account(&self, id: &str) -> Result<bool, DatabaseError> {
        self.delete_item(id, ItemType::Account).await
    }

    // =========================================================================
    // Course queries
    // =========================================================================

    pub async fn create_course(
        &self,
        id: &str,
        params: &CourseParams,
    ) -> Result<Course, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO courses (id, category_id, title, description, instructor, image_url, price_usd, price_vnd, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&params.category_id)
        .bind(&params.title)
        .bind(&params.description)
        .bind(&params.instructor)
        .bind(&params.image_url)
        .bind(params.price_usd)
        .bind(params.price_vnd)
        .bind(params.is_active)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_course(id).await
    }

    pub async fn get_course(&self, id: &str) -> Result<Course, DatabaseError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Course {id}")))
    }

    /// List courses, newest first.
    pub async fn list_courses(&self, include_inactive: bool) -> Result<Vec<Course>, DatabaseError> {
        let courses = if include_inactive {
            sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY created_at DESC, rowid DESC")
                .fetch_all(self.pool())
                .await?
        } else {
            sqlx::query_as::<_, Course>(
                "SELECT * FROM courses WHERE is_active = 1 ORDER BY created_at DESC, rowid DESC",
            )
            .fetch_all(self.pool())
            .await?
        };
        Ok(courses)
    }

    pub async fn update_course(
        &self,
        id: &str,
        params: &CourseParams,
    ) -> Result<Course, DatabaseError> {
        let result = sqlx::query(
            "UPDATE courses SET category_id = ?, title = ?, description = ?, instructor = ?, image_url = ?, price_usd = ?, price_vnd = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&params.category_id)
        .bind(&params.title)
        .bind(&params.description)
        .bind(&params.instructor)
        .bind(&params.image_url)
        .bind(params.price_usd)
        .bind(params.price_vnd)
        .bind(params.is_active)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Course {id}")));
        }
        self.get_course(id).await
    }

    /// Delete a course and any cart lines for it.
    pub async fn delete_course(&self, id: &str) -> Result<bool, DatabaseError> {
        self.delete_item(id, ItemType::Course).await
    }

    async fn delete_item(&self, id: &str, item_type: ItemType) -> Result<bool, DatabaseError> {
        let sql = match item_type {
            ItemType::Account => "DELETE FROM accounts WHERE id = ?",
            ItemType::Course => "DELETE FROM courses WHERE id = ?",
        };
        let mut tx = self.pool().begin().await?;
        let result = sqlx::query(sql).bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("DELETE FROM cart_items WHERE item_id = ? AND item_type = ?")
            .bind(id)
            .bind(item_type)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Whether a sellable item exists. Used to validate comment and cart subjects.
    pub async fn item_exists(
        &self,
        item_id: &str,
        item_type: ItemType,
    ) -> Result<bool, DatabaseError> {
        let sql = match item_type {
            ItemType::Account => "SELECT COUNT(*) FROM accounts WHERE id = ?",
            ItemType::Course => "SELECT COUNT(*) FROM courses WHERE id = ?",
        };
        let count: i64 = sqlx::query_scalar(sql)
            .bind(item_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count > 0)
    }
}

/// Make the account's variants match `variants`: known ids are updated in
/// place and keep their id, the rest are inserted, and anything not listed is
/// deleted.
async fn sync_variants(
    tx: &mut Transaction<'_, Sqlite>,
    account_id: &str,
    variants: &[VariantParams],
) -> Result<(), DatabaseError> {
    let existing: HashSet<String> =
        sqlx::query_scalar::<_, String>("SELECT id FROM account_variants WHERE account_id = ?")
            .bind(account_id)
            .fetch_all(&mut **tx)
            .await?
            .into_iter()
            .collect();

    let mut kept = HashSet::new();
    for (position, variant) in variants.iter().enumerate() {
        let position = i64::try_from(position).unwrap_or(i64::MAX);
        match variant.id.as_deref().filter(|id| existing.contains(*id)) {
            Some(variant_id) if kept.insert(variant_id.to_string()) => {
                sqlx::query(
                    "UPDATE account_variants SET name = ?, price_usd = ?, price_vnd = ?, stock = ?, position = ? WHERE id = ?",
                )
                .bind(&variant.name)
                .bind(variant.price_usd)
                .bind(variant.price_vnd)
                .bind(variant.stock)
                .bind(position)
                .bind(variant_id)
                .execute(&mut **tx)
                .await?;
            }
            _ => {
                sqlx::query(
                    "INSERT INTO account_variants (id, account_id, name, price_usd, price_vnd, stock, position) VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(account_id)
                .bind(&variant.name)
                .bind(variant.price_usd)
                .bind(variant.price_vnd)
                .bind(variant.stock)
                .bind(position)
                .execute(&mut **tx)
                .await?;
            }
        }
    }

    for stale in existing.difference(&kept) {
        sqlx::query("DELETE FROM account_variants WHERE id = ?")
            .bind(stale)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
