//! SQLite storage for the storefront server.
//!
//! Provides persistence for users and profiles, the catalog (categories,
//! accounts with variants, courses), promotions, carts and comments.

mod db;
mod models;
mod queries_cart;
mod queries_catalog;
mod queries_comments;
mod queries_promotions;
mod queries_users;


pub use db::{DatabaseError, StoreDatabase};
pub use models::*;
pub use queries_cart::{MAX_QUANTITY, NewCartItem};
pub use queries_catalog::{AccountParams, CategoryParams, CourseParams, VariantParams};
pub use queries_comments::NewComment;
pub use queries_promotions::PromotionParams;
pub use queries_users::ProfileChanges;
