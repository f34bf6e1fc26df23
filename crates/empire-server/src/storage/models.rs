//! Data models for storefront storage.

use serde::{Deserialize, Serialize, Serializer};

use empire_core::catalog::{ItemType, Listing};
use empire_core::comments::Threadable;
use empire_core::pricing::{Currency, Priced, min_price};
use empire_core::promotion::{PromotionStatus, PromotionTerms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Banned,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub status: ProfileStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_banned(&self) -> bool {
        self.status == ProfileStatus::Banned
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountVariant {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub price_usd: f64,
    pub price_vnd: f64,
    pub stock: i64,
    pub position: i64,
}

impl Priced for AccountVariant {
    fn price(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.price_usd,
            Currency::Vnd => self.price_vnd,
        }
    }
}

/// An account listing with its variants in display order.
#[derive(Debug, Clone, Serialize)]
pub struct AccountListing {
    #[serde(flatten)]
    pub account: Account,
    pub variants: Vec<AccountVariant>,
}

impl Listing for AccountListing {
    fn category_id(&self) -> Option<&str> {
        self.account.category_id.as_deref()
    }

    fn list_price(&self, currency: Currency) -> Option<f64> {
        min_price(&self.variants, currency)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub image_url: Option<String>,
    pub price_usd: f64,
    pub price_vnd: f64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Priced for Course {
    fn price(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.price_usd,
            Currency::Vnd => self.price_vnd,
        }
    }
}

impl Listing for Course {
    fn category_id(&self) -> Option<&str> {
        self.category_id.as_deref()
    }

    fn list_price(&self, currency: Currency) -> Option<f64> {
        Some(self.price(currency))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Promotion {
    pub id: String,
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
    pub used_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Promotion {
    pub fn terms(&self) -> PromotionTerms {
        PromotionTerms {
            discount_percent: self.discount_percent,
            max_discount_amount: self.max_discount_amount,
            min_order_amount: self.min_order_amount,
            start_date: self.start_date,
            end_date: self.end_date,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
        }
    }

    /// Attach the status as of `now`.
    pub fn at(self, now: i64) -> PromotionView {
        let status = self.terms().status(now);
        PromotionView {
            promotion: self,
            status,
        }
    }
}

/// A promotion as returned to callers, with its date-derived status.
#[derive(Debug, Clone, Serialize)]
pub struct PromotionView {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub status: PromotionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub item_id: String,
    pub item_type: ItemType,
    #[serde(serialize_with = "empty_as_none")]
    pub variant_id: String,
    pub quantity: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[allow(clippy::ptr_arg)]
fn empty_as_none<S: Serializer>(value: &String, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_empty() {
        serializer.serialize_none()
    } else {
        serializer.serialize_some(value)
    }
}

/// The author's profile as of the time the comment is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CommentAuthor {
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub item_id: String,
    pub item_type: ItemType,
    pub user_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    /// 0 for a root, one more than the parent for a reply.
    pub depth: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(flatten)]
    pub author: CommentAuthor,
}

impl Threadable for Comment {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}
