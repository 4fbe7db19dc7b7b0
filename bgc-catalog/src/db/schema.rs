//! Catalog database schema
//!
//! Idempotent table creation, safe to run on every startup. Game identity
//! and metadata entry identity are UUIDs stored as TEXT. Metadata values
//! are unique per kind under a case-insensitive collation; the stored
//! value keeps its original casing.

use bgc_common::Result;
use sqlx::SqlitePool;

/// Create all catalog tables if they do not already exist
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    create_games_table(pool).await?;

    // Metadata entry tables, one per kind
    create_metadata_table(pool, "names").await?;
    create_metadata_table(pool, "categories").await?;
    create_metadata_table(pool, "mechanics").await?;
    create_metadata_table(pool, "designers").await?;
    create_metadata_table(pool, "artists").await?;
    create_metadata_table(pool, "publishers").await?;

    create_game_metadata_table(pool).await?;

    Ok(())
}

async fn create_games_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id TEXT PRIMARY KEY,
            bgg_id INTEGER UNIQUE,
            slug TEXT NOT NULL UNIQUE,
            published INTEGER,
            min_players INTEGER,
            max_players INTEGER,
            min_player_age INTEGER,
            play_time INTEGER,
            min_play_time INTEGER,
            max_play_time INTEGER,
            description TEXT,
            thumbnail TEXT,
            image TEXT,
            complexity REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_metadata_table(pool: &SqlitePool, table: &str) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            value TEXT NOT NULL UNIQUE COLLATE NOCASE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        table
    );

    sqlx::query(&sql).execute(pool).await?;

    Ok(())
}

/// Link table from games to metadata entries of every kind.
///
/// Link insertion order (rowid) is the canonical attribute order for a
/// game, so detail queries sort on it.
async fn create_game_metadata_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_metadata (
            game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            metadata_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            UNIQUE(game_id, metadata_id, kind)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_initialization_is_idempotent() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        initialize_schema(&pool).await.expect("First init failed");
        initialize_schema(&pool).await.expect("Second init failed");

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('games', 'names', 'categories', 'mechanics', 'designers', 'artists', \
              'publishers', 'game_metadata')",
        )
        .fetch_one(&pool)
        .await
        .expect("Failed to count tables");

        assert_eq!(count, 8);
    }
}
