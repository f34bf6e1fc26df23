//! SQLite database for the storefront server.

empire_core::define_database!(StoreDatabase, "Store database migrations complete");

pub use empire_core::db::DatabaseError;
