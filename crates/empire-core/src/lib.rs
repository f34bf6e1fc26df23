//! Empire Tech core library
//!
//! Shared, HTTP-free functionality for the storefront server:
//! - Comment reply-tree building
//! - Pricing, catalog filter/sort and promotion rules
//! - Boundary validation
//! - Configuration resolution, database helpers and tracing setup

pub mod catalog;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod pricing;
pub mod promotion;
pub mod tracing_init;
pub mod validation;

pub use config::StoreConfig;
pub use error::{Error, Result};
