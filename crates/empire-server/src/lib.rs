//! Empire Tech storefront server library.
//!
//! - SQLite storage for users, catalog, promotions, carts and comments
//! - JWT authentication and password hashing
//! - The access policy shared by every handler
//! - The axum JSON API

pub mod auth;
pub mod policy;
pub mod server;
pub mod storage;
