//! Game persistence and lookup
//!
//! A game row and its metadata links commit as one transaction. Metadata
//! entries themselves are resolved against the pool before that
//! transaction opens, so entries created for a game whose insert aborts
//! remain in the catalog as reusable rows.

use bgc_common::{Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::metadata::{self, MetadataKind, MetadataRecord};

/// A full game record: scalars plus resolved attribute lists
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: Uuid,
    pub bgg_id: Option<i64>,
    pub slug: String,
    pub published: Option<i64>,
    pub min_players: Option<i64>,
    pub max_players: Option<i64>,
    pub min_player_age: Option<i64>,
    pub play_time: Option<i64>,
    pub min_play_time: Option<i64>,
    pub max_play_time: Option<i64>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub complexity: Option<f64>,
    pub name: Vec<MetadataRecord>,
    pub category: Vec<MetadataRecord>,
    pub mechanic: Vec<MetadataRecord>,
    pub designer: Vec<MetadataRecord>,
    pub artist: Vec<MetadataRecord>,
    pub publisher: Vec<MetadataRecord>,
}

impl GameRecord {
    /// Attribute lists paired with their kind, in canonical order
    pub fn kinds(&self) -> [(MetadataKind, &[MetadataRecord]); 6] {
        [
            (MetadataKind::Name, self.name.as_slice()),
            (MetadataKind::Category, self.category.as_slice()),
            (MetadataKind::Mechanic, self.mechanic.as_slice()),
            (MetadataKind::Designer, self.designer.as_slice()),
            (MetadataKind::Artist, self.artist.as_slice()),
            (MetadataKind::Publisher, self.publisher.as_slice()),
        ]
    }
}

/// One row of the game list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: Uuid,
    pub bgg_id: Option<i64>,
    pub slug: String,
    pub name: Option<String>,
}

/// One match of a bulk id/slug lookup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLookupEntry {
    pub id: Uuid,
    pub slug: String,
}

/// Check the uniqueness constraints before insertion.
///
/// A hit reports which field collided and the id of the pre-existing game,
/// so callers can distinguish "already exists" from every other failure.
pub async fn check_unique(pool: &SqlitePool, bgg_id: Option<i64>, slug: &str) -> Result<()> {
    if let Some(bgg_id) = bgg_id {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM games WHERE bgg_id = ?")
                .bind(bgg_id)
                .fetch_optional(pool)
                .await?;
        if let Some(id) = existing {
            return Err(Error::Conflict {
                field: "bggId",
                existing_id: parse_game_id(&id)?,
            });
        }
    }

    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM games WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    if let Some(id) = existing {
        return Err(Error::Conflict {
            field: "slug",
            existing_id: parse_game_id(&id)?,
        });
    }

    Ok(())
}

/// Insert a game row and all of its metadata links in one transaction
pub async fn insert_game_record(pool: &SqlitePool, record: &GameRecord) -> Result<()> {
    let mut tx = pool.begin().await?;

    let insert = sqlx::query(
        r#"
        INSERT INTO games (
            id, bgg_id, slug, published, min_players, max_players,
            min_player_age, play_time, min_play_time, max_play_time,
            description, thumbnail, image, complexity
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.bgg_id)
    .bind(&record.slug)
    .bind(record.published)
    .bind(record.min_players)
    .bind(record.max_players)
    .bind(record.min_player_age)
    .bind(record.play_time)
    .bind(record.min_play_time)
    .bind(record.max_play_time)
    .bind(&record.description)
    .bind(&record.thumbnail)
    .bind(&record.image)
    .bind(record.complexity)
    .execute(&mut *tx)
    .await;

    if let Err(err) = insert {
        if metadata::is_unique_violation(&err) {
            // Raced another insert past the dedup check; report the
            // conflict with the winning row's id.
            drop(tx);
            check_unique(pool, record.bgg_id, &record.slug).await?;
        }
        return Err(err.into());
    }

    for (kind, entries) in record.kinds() {
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO game_metadata (game_id, metadata_id, kind)
                VALUES (?, ?, ?)
                ON CONFLICT(game_id, metadata_id, kind) DO NOTHING
                "#,
            )
            .bind(record.id.to_string())
            .bind(entry.id.to_string())
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    Ok(())
}

/// Load all games (possibly empty), oldest first
pub async fn get_game_list(pool: &SqlitePool) -> Result<Vec<GameSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT g.id, g.bgg_id, g.slug,
               (SELECT n.value FROM game_metadata l
                JOIN names n ON n.id = l.metadata_id
                WHERE l.game_id = g.id AND l.kind = 'name'
                ORDER BY l.rowid LIMIT 1) AS name
        FROM games g
        ORDER BY g.created_at, g.rowid
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut games = Vec::with_capacity(rows.len());
    for row in rows {
        let id_str: String = row.get("id");
        games.push(GameSummary {
            id: parse_game_id(&id_str)?,
            bgg_id: row.get("bgg_id"),
            slug: row.get("slug"),
            name: row.get("name"),
        });
    }

    Ok(games)
}

/// Load one game with all attribute lists, by id or slug
pub async fn get_game_details(pool: &SqlitePool, key: &str) -> Result<Option<GameRecord>> {
    let row = match find_game_row(pool, key).await? {
        Some(row) => row,
        None => return Ok(None),
    };

    let id_str: String = row.get("id");
    let id = parse_game_id(&id_str)?;

    let mut record = GameRecord {
        id,
        bgg_id: row.get("bgg_id"),
        slug: row.get("slug"),
        published: row.get("published"),
        min_players: row.get("min_players"),
        max_players: row.get("max_players"),
        min_player_age: row.get("min_player_age"),
        play_time: row.get("play_time"),
        min_play_time: row.get("min_play_time"),
        max_play_time: row.get("max_play_time"),
        description: row.get("description"),
        thumbnail: row.get("thumbnail"),
        image: row.get("image"),
        complexity: row.get("complexity"),
        name: Vec::new(),
        category: Vec::new(),
        mechanic: Vec::new(),
        designer: Vec::new(),
        artist: Vec::new(),
        publisher: Vec::new(),
    };

    record.name = metadata::entries_for_game(pool, id, MetadataKind::Name).await?;
    record.category = metadata::entries_for_game(pool, id, MetadataKind::Category).await?;
    record.mechanic = metadata::entries_for_game(pool, id, MetadataKind::Mechanic).await?;
    record.designer = metadata::entries_for_game(pool, id, MetadataKind::Designer).await?;
    record.artist = metadata::entries_for_game(pool, id, MetadataKind::Artist).await?;
    record.publisher = metadata::entries_for_game(pool, id, MetadataKind::Publisher).await?;

    Ok(Some(record))
}

/// Match a list of id/slug keys; unmatched keys are silently omitted
pub async fn perform_game_lookup(pool: &SqlitePool, keys: &[String]) -> Result<Vec<GameLookupEntry>> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; keys.len()].join(", ");
    let sql = format!(
        "SELECT id, slug FROM games WHERE id IN ({placeholders}) OR slug IN ({placeholders}) \
         ORDER BY created_at, rowid"
    );

    let mut query = sqlx::query(&sql);
    for key in keys {
        query = query.bind(key);
    }
    for key in keys {
        query = query.bind(key);
    }

    let rows = query.fetch_all(pool).await?;

    let mut matches = Vec::with_capacity(rows.len());
    for row in rows {
        let id_str: String = row.get("id");
        matches.push(GameLookupEntry {
            id: parse_game_id(&id_str)?,
            slug: row.get("slug"),
        });
    }

    Ok(matches)
}

/// Key is matched as a typed id first, falling back to slug.
///
/// A key that parses as a UUID but matches no row still gets the slug
/// fallback, so a slug that happens to look like a UUID resolves.
async fn find_game_row(pool: &SqlitePool, key: &str) -> Result<Option<SqliteRow>> {
    if let Ok(id) = Uuid::parse_str(key) {
        let row = sqlx::query("SELECT * FROM games WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(pool)
            .await?;
        if row.is_some() {
            return Ok(row);
        }
    }

    Ok(sqlx::query("SELECT * FROM games WHERE slug = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?)
}

fn parse_game_id(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::Internal(format!("invalid game id: {}", e)))
}
