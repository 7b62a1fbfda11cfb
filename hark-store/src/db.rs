// Standard library
use std::path::Path;
use std::str::FromStr;

// External crates
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

// Internal imports
use hark_core::error::{HarkError, Result};

pub(crate) fn db_error(err: sqlx::Error) -> HarkError {
    HarkError::Database(err.to_string())
}

/// Open (creating if necessary) the sqlite database file.
#[instrument(skip_all, fields(db_path = %db_path.display()))]
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    SqlitePool::connect_with(options).await.map_err(db_error)
}

/// An in-memory database. A single connection that never expires, because
/// every new connection would see an empty database.
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(db_error)?;

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(db_error)
}

/// Apply the fixed schema. Already-applied migrations are skipped.
#[instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| HarkError::Migration(e.to_string()))
}
