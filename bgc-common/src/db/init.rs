//! Database connection bootstrap
//!
//! Opens (and creates on first run) the SQLite database and applies the
//! connection-level pragmas every BGC service relies on. Table creation is
//! owned by the service crate, which passes its schema initializer in.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection, creating the file if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    apply_pragmas(&pool).await?;

    Ok(pool)
}

/// Apply connection pragmas: foreign keys, WAL journal, busy timeout.
///
/// WAL allows concurrent readers with one writer; the busy timeout keeps
/// short lock contention from surfacing as errors.
pub async fn apply_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}
