//! Cart queries.
//!
//! Both "get or create" paths lean on unique constraints instead of a
//! read-then-write, so concurrent first access cannot duplicate rows.

use empire_core::catalog::ItemType;
use empire_core::db::unix_timestamp;

use super::db::{DatabaseError, StoreDatabase};
use super::models::{Cart, CartItem};

/// Largest quantity a single cart line can hold.
pub const MAX_QUANTITY: i64 = 99;

#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub item_id: String,
    pub item_type: ItemType,
    pub variant_id: Option<String>,
    pub quantity: i64,
}

impl StoreDatabase {
    /// Return the user's cart, creating it on first access.
    pub async fn get_or_create_cart(&self, user_id: &str) -> Result<Cart, DatabaseError> {
        sqlx::query("INSERT INTO carts (id, user_id, created_at) VALUES (?, ?, ?) ON CONFLICT(user_id) DO NOTHING")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Cart for user {user_id}")))
    }

    /// Lines of a cart in the order they were first added.
    pub async fn list_cart_items(&self, cart_id: &str) -> Result<Vec<CartItem>, DatabaseError> {
        let items = sqlx::query_as::<_, CartItem>(
            "SELECT * FROM cart_items WHERE cart_id = ? ORDER BY created_at, rowid",
        )
        .bind(cart_id)
        .fetch_all(self.pool())
        .await?;
        Ok(items)
    }

    /// Add a line, or increase the quantity of the matching line.
    pub async fn add_cart_item(
        &self,
        cart_id: &str,
        item: &NewCartItem,
    ) -> Result<CartItem, DatabaseError> {
        let now = unix_timestamp();
        let variant_id = item.variant_id.as_deref().unwrap_or("");

        let row = sqlx::query_as::<_, CartItem>(
            "INSERT INTO cart_items (id, cart_id, item_id, item_type, variant_id, quantity, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(cart_id, item_id, item_type, variant_id) DO UPDATE SET \
                quantity = MIN(cart_items.quantity + excluded.quantity, ?), \
                updated_at = excluded.updated_at \
             RETURNING *",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(cart_id)
        .bind(&item.item_id)
        .bind(item.item_type)
        .bind(variant_id)
        .bind(item.quantity)
        .bind(now)
        .bind(now)
        .bind(MAX_QUANTITY)
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn get_cart_item(&self, id: &str) -> Result<CartItem, DatabaseError> {
        sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Cart item {id}")))
    }

    /// The user owning the cart that holds `item_id`.
    pub async fn cart_item_owner(&self, item_id: &str) -> Result<String, DatabaseError> {
        sqlx::query_scalar::<_, String>(
            "SELECT c.user_id FROM cart_items i JOIN carts c ON c.id = i.cart_id WHERE i.id = ?",
        )
        .bind(item_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Cart item {item_id}")))
    }

    pub async fn set_cart_item_quantity(
        &self,
        id: &str,
        quantity: i64,
    ) -> Result<CartItem, DatabaseError> {
        let result = sqlx::query("UPDATE cart_items SET quantity = ?, updated_at = ? WHERE id = ?")
            .bind(quantity)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Cart item {id}")));
        }
        self.get_cart_item(id).await
    }

    pub async fn delete_cart_item(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
