//! Helps to connect to the database.
//!
//! The pool is constructed here and handed to [`crate::store::TagStore`] by
//! whoever bootstraps the process - there is no global connection handle.

use std::str::FromStr as _;

use camino::Utf8Path;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::error::DatabaseError;

pub const TAGS_TABLE: &str = "tags";
pub const TAG_HISTORY_TABLE: &str = "tag_history";
pub const TAG_RELATIONS_TABLE: &str = "tag_relations";
pub const ENTRY_TAGS_TABLE: &str = "entry_tags";

pub type Db = Pool<Sqlite>;

/// Connects to (creating if missing) the taxonomy database at the given
/// file path, then brings its schema up to date.
pub async fn connect(db_file: &Utf8Path) -> Result<Db, DatabaseError> {
    let opts = SqliteConnectOptions::new()
        .filename(db_file)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .connect_with(opts)
        .await
        .inspect_err(|e| tracing::error!("Failed to connect to taxonomy database. err: {e}"))
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    migrate(&pool).await?;
    Ok(pool)
}

/// An in-memory database, mostly useful for tests and demos.
///
/// Capped at one connection - each sqlite `:memory:` connection is its own
/// database, so a wider pool would hand out empty ones.
pub async fn connect_in_memory() -> Result<Db, DatabaseError> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Runs the embedded migrations. Safe to call repeatedly.
pub async fn migrate(pool: &Db) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .inspect_err(|e| {
            tracing::error!(
                "Database connection succeeded, but migrating the database failed! err: {e}"
            )
        })
        .map_err(DatabaseError::MigrationFailed)
}
