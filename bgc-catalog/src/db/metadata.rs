//! Metadata catalog resolution
//!
//! Games carry six many-valued attribute kinds (names, categories,
//! mechanics, designers, artists, publishers), each backed by its own
//! entry table shared across games. The resolver turns raw attribute
//! values into entry rows, creating rows lazily the first time a value is
//! seen. Uniqueness per kind is case-insensitive at the constraint level;
//! the stored value keeps the casing of the first writer.

use bgc_common::{Error, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// The six many-valued attribute kinds of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Name,
    Category,
    Mechanic,
    Designer,
    Artist,
    Publisher,
}

impl MetadataKind {
    /// All kinds, in the order attribute lists appear on a game record
    pub const ALL: [MetadataKind; 6] = [
        MetadataKind::Name,
        MetadataKind::Category,
        MetadataKind::Mechanic,
        MetadataKind::Designer,
        MetadataKind::Artist,
        MetadataKind::Publisher,
    ];

    /// Entry table for this kind
    pub fn table(self) -> &'static str {
        match self {
            MetadataKind::Name => "names",
            MetadataKind::Category => "categories",
            MetadataKind::Mechanic => "mechanics",
            MetadataKind::Designer => "designers",
            MetadataKind::Artist => "artists",
            MetadataKind::Publisher => "publishers",
        }
    }

    /// Kind tag stored in the game_metadata link table
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataKind::Name => "name",
            MetadataKind::Category => "category",
            MetadataKind::Mechanic => "mechanic",
            MetadataKind::Designer => "designer",
            MetadataKind::Artist => "artist",
            MetadataKind::Publisher => "publisher",
        }
    }
}

/// A resolved metadata entry
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRecord {
    pub id: Uuid,
    pub value: String,
}

/// Resolve raw attribute values to metadata entries within one kind.
///
/// Values are trimmed; blank values are dropped. Equivalent values
/// (case-folded) within one call hit storage once, and repeated inputs map
/// to the same entry. Output order matches the input.
pub async fn resolve(
    pool: &SqlitePool,
    kind: MetadataKind,
    raw_values: &[String],
) -> Result<Vec<MetadataRecord>> {
    let mut by_key: HashMap<String, MetadataRecord> = HashMap::new();
    let mut resolved = Vec::new();

    for raw in raw_values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }

        let key = value.to_lowercase();
        if let Some(record) = by_key.get(&key) {
            resolved.push(record.clone());
            continue;
        }

        let record = lookup_or_create(pool, kind, value).await?;
        by_key.insert(key, record.clone());
        resolved.push(record);
    }

    Ok(resolved)
}

/// Load an entry by value (case-insensitive) within a kind
pub async fn lookup_entry(
    pool: &SqlitePool,
    kind: MetadataKind,
    value: &str,
) -> Result<Option<MetadataRecord>> {
    let sql = format!(
        "SELECT id, value FROM {} WHERE value = ? COLLATE NOCASE",
        kind.table()
    );

    let row = sqlx::query(&sql).bind(value).fetch_optional(pool).await?;

    match row {
        Some(row) => {
            let id_str: String = row.get("id");
            Ok(Some(MetadataRecord {
                id: parse_entry_id(kind, &id_str)?,
                value: row.get("value"),
            }))
        }
        None => Ok(None),
    }
}

async fn lookup_or_create(
    pool: &SqlitePool,
    kind: MetadataKind,
    value: &str,
) -> Result<MetadataRecord> {
    if let Some(existing) = lookup_entry(pool, kind, value).await? {
        return Ok(existing);
    }

    let record = MetadataRecord {
        id: Uuid::new_v4(),
        value: value.to_string(),
    };

    let sql = format!("INSERT INTO {} (id, value) VALUES (?, ?)", kind.table());
    match sqlx::query(&sql)
        .bind(record.id.to_string())
        .bind(&record.value)
        .execute(pool)
        .await
    {
        Ok(_) => Ok(record),
        Err(err) if is_unique_violation(&err) => {
            // Lost a race with a concurrent insert of the same value; the
            // row exists now, so read it back instead of failing.
            warn!(kind = kind.as_str(), value, "metadata insert raced, re-querying");
            lookup_entry(pool, kind, value).await?.ok_or_else(|| {
                Error::Internal(format!(
                    "metadata entry '{}' vanished after unique violation in {}",
                    value,
                    kind.table()
                ))
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Load a game's entries of one kind, in link insertion order
pub async fn entries_for_game(
    pool: &SqlitePool,
    game_id: Uuid,
    kind: MetadataKind,
) -> Result<Vec<MetadataRecord>> {
    let sql = format!(
        "SELECT m.id, m.value FROM game_metadata l \
         JOIN {} m ON m.id = l.metadata_id \
         WHERE l.game_id = ? AND l.kind = ? \
         ORDER BY l.rowid",
        kind.table()
    );

    let rows = sqlx::query(&sql)
        .bind(game_id.to_string())
        .bind(kind.as_str())
        .fetch_all(pool)
        .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let id_str: String = row.get("id");
        entries.push(MetadataRecord {
            id: parse_entry_id(kind, &id_str)?,
            value: row.get("value"),
        });
    }

    Ok(entries)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}

fn parse_entry_id(kind: MetadataKind, text: &str) -> Result<Uuid> {
    Uuid::parse_str(text)
        .map_err(|e| Error::Internal(format!("invalid id in table {}: {}", kind.table(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        crate::db::schema::initialize_schema(&pool)
            .await
            .expect("Schema initialization failed");

        pool
    }

    #[tokio::test]
    async fn test_resolve_creates_then_reuses() {
        let pool = test_pool().await;

        let first = resolve(&pool, MetadataKind::Category, &["Strategy".to_string()])
            .await
            .expect("First resolve failed");
        let second = resolve(&pool, MetadataKind::Category, &["Strategy".to_string()])
            .await
            .expect("Second resolve failed");

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, second[0].id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_resolve_duplicate_input_maps_to_one_entry() {
        let pool = test_pool().await;

        let resolved = resolve(
            &pool,
            MetadataKind::Mechanic,
            &["Deck Building".to_string(), "Deck Building".to_string()],
        )
        .await
        .expect("Resolve failed");

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].id, resolved[1].id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mechanics")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_resolve_is_case_and_whitespace_insensitive() {
        let pool = test_pool().await;

        let first = resolve(&pool, MetadataKind::Designer, &["Uwe Rosenberg".to_string()])
            .await
            .expect("First resolve failed");
        let second = resolve(
            &pool,
            MetadataKind::Designer,
            &["  uwe rosenberg  ".to_string()],
        )
        .await
        .expect("Second resolve failed");

        assert_eq!(first[0].id, second[0].id);
        // Stored value keeps the casing of the first writer
        assert_eq!(second[0].value, "Uwe Rosenberg");
    }

    #[tokio::test]
    async fn test_resolve_preserves_input_order() {
        let pool = test_pool().await;

        let resolved = resolve(
            &pool,
            MetadataKind::Category,
            &[
                "Economic".to_string(),
                "Strategy".to_string(),
                "Economic".to_string(),
                "Negotiation".to_string(),
            ],
        )
        .await
        .expect("Resolve failed");

        let values: Vec<&str> = resolved.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, ["Economic", "Strategy", "Economic", "Negotiation"]);
    }

    #[tokio::test]
    async fn test_resolve_drops_blank_values() {
        let pool = test_pool().await;

        let resolved = resolve(
            &pool,
            MetadataKind::Publisher,
            &["".to_string(), "   ".to_string(), "Rio Grande Games".to_string()],
        )
        .await
        .expect("Resolve failed");

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].value, "Rio Grande Games");
    }

    #[tokio::test]
    async fn test_kinds_are_isolated() {
        let pool = test_pool().await;

        let cat = resolve(&pool, MetadataKind::Category, &["Economic".to_string()])
            .await
            .unwrap();
        let mech = resolve(&pool, MetadataKind::Mechanic, &["Economic".to_string()])
            .await
            .unwrap();

        assert_ne!(cat[0].id, mech[0].id);
    }
}
