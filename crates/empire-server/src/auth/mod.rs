//! Authentication for the storefront.
//!
//! Provides JWT access tokens and password hashing.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtManager;
