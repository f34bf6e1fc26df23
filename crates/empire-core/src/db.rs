//! SQLite plumbing shared by the storage layer.
//!
//! [`DatabaseError`] classifies `sqlx` failures so the HTTP layer can tell a
//! duplicate (`Conflict`) from a dangling reference (`Constraint`). Stores are
//! declared with [`define_database!`], which wires pool setup and the
//! crate's `migrations/` directory together.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Connections kept open against an on-disk store.
const FILE_POOL_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    /// The named row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique index rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A foreign key or CHECK rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        let sqlx::Error::Database(db_err) = &e else {
            return Self::Query(e.to_string());
        };
        let message = db_err.message().to_string();
        if db_err.is_unique_violation() {
            Self::Conflict(message)
        } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
            Self::Constraint(message)
        } else {
            Self::Query(message)
        }
    }
}

async fn connect(
    options: SqliteConnectOptions,
    max_connections: u32,
) -> Result<Pool<Sqlite>, DatabaseError> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options.foreign_keys(true))
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))
}

/// Open the store file at `path`, creating it and its directory if needed.
/// The pool runs in WAL mode with foreign keys enforced.
pub async fn open_pool(path: &Path) -> Result<Pool<Sqlite>, DatabaseError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = connect(options, FILE_POOL_CONNECTIONS).await?;

    info!(path = %path.display(), "Store file opened");
    Ok(pool)
}

/// In-memory pool for tests.
///
/// Each connection would get its own empty database, so the pool holds
/// exactly one. Callers must not query through the pool while a transaction
/// on it is open.
pub async fn open_pool_in_memory() -> Result<Pool<Sqlite>, DatabaseError> {
    connect(SqliteConnectOptions::new().in_memory(true), 1).await
}

/// Seconds since the Unix epoch; all stored timestamps use this.
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Declare a cloneable store type backed by a `SQLite` pool.
///
/// ```ignore
/// empire_core::define_database!(StoreDatabase, "Store database migrations complete");
/// ```
///
/// The type gets `open(path)`, `open_in_memory()` and `pool()`. Both
/// constructors apply the invoking crate's `./migrations` before returning.
#[macro_export]
macro_rules! define_database {
    ($name:ident, $migration_msg:expr) => {
        #[derive(Clone)]
        pub struct $name {
            pool: ::sqlx::Pool<::sqlx::Sqlite>,
        }

        impl $name {
            /// Open or create the store file at `path`.
            pub async fn open(
                path: &::std::path::Path,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                Self::migrated($crate::db::open_pool(path).await?).await
            }

            /// Fresh in-memory store.
            pub async fn open_in_memory() -> ::std::result::Result<Self, $crate::db::DatabaseError>
            {
                Self::migrated($crate::db::open_pool_in_memory().await?).await
            }

            async fn migrated(
                pool: ::sqlx::Pool<::sqlx::Sqlite>,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                ::sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| $crate::db::DatabaseError::Migration(e.to_string()))?;
                ::tracing::info!($migration_msg);
                Ok(Self { pool })
            }

            pub const fn pool(&self) -> &::sqlx::Pool<::sqlx::Sqlite> {
                &self.pool
            }
        }
    };
}
