//! Game ingestion orchestration
//!
//! Coordinates single-game insertion (manual or BGG-sourced) and the batch
//! variant. Batch items are classified with a typed per-item outcome:
//! "not found" and "already exists" become skip records, anything else
//! aborts the whole batch and propagates.

use bgc_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::games::{self, GameRecord};
use crate::db::metadata::{self, MetadataKind};
use crate::ingest::bgg::BggSource;
use crate::ingest::payload::GamePayload;

/// Summary of a batch insert; both lists preserve input order
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub inserted: Vec<GameRecord>,
    pub skipped: Vec<SkippedGame>,
}

/// One batch item that was skipped, with the classified reason
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedGame {
    pub bgg_id: i64,
    pub status: u16,
    pub reason: String,
}

/// Per-item outcome of a batch insert
enum ItemOutcome {
    Inserted(GameRecord),
    Skipped(SkippedGame),
}

/// Insert a game from an explicit payload.
///
/// Validates scalars, runs the dedup check, resolves all six attribute
/// kinds, and commits the game row plus links as one transaction. The
/// returned record carries the resolved entry ids.
pub async fn insert_game(pool: &SqlitePool, payload: &GamePayload) -> Result<GameRecord> {
    payload.validate()?;
    let slug = payload.slug_or_derived()?;

    games::check_unique(pool, payload.bgg_id, &slug).await?;

    // Metadata entries are shared catalog rows: they resolve against the
    // pool before the game transaction opens, and survive if it aborts.
    let name = metadata::resolve(pool, MetadataKind::Name, &payload.name).await?;
    let category = metadata::resolve(pool, MetadataKind::Category, &payload.category).await?;
    let mechanic = metadata::resolve(pool, MetadataKind::Mechanic, &payload.mechanic).await?;
    let designer = metadata::resolve(pool, MetadataKind::Designer, &payload.designer).await?;
    let artist = metadata::resolve(pool, MetadataKind::Artist, &payload.artist).await?;
    let publisher = metadata::resolve(pool, MetadataKind::Publisher, &payload.publisher).await?;

    let record = GameRecord {
        id: Uuid::new_v4(),
        bgg_id: payload.bgg_id,
        slug,
        published: payload.published,
        min_players: payload.min_players,
        max_players: payload.max_players,
        min_player_age: payload.min_player_age,
        play_time: payload.play_time,
        min_play_time: payload.min_play_time,
        max_play_time: payload.max_play_time,
        description: payload.description.clone(),
        thumbnail: payload.thumbnail.clone(),
        image: payload.image.clone(),
        complexity: payload.complexity,
        name,
        category,
        mechanic,
        designer,
        artist,
        publisher,
    };

    games::insert_game_record(pool, &record).await?;
    info!(game_id = %record.id, slug = %record.slug, "inserted game");

    Ok(record)
}

/// Insert a game fetched from the upstream source by external id.
///
/// `Ok(None)` means the source has no record of the id; nothing is
/// written in that case.
pub async fn insert_bgg_game(
    pool: &SqlitePool,
    source: &dyn BggSource,
    bgg_id: i64,
) -> Result<Option<GameRecord>> {
    let mut payload = match source.fetch_by_id(bgg_id).await? {
        Some(payload) => payload,
        None => {
            info!(bgg_id, "upstream has no record of game");
            return Ok(None);
        }
    };

    payload.bgg_id = Some(bgg_id);

    insert_game(pool, &payload).await.map(Some)
}

/// Insert a list of games by external id, sequentially and in input order.
///
/// Exactly two outcomes are recovered into per-item skip records:
/// upstream not-found, and a dedup conflict. Any other error aborts the
/// batch and propagates unchanged.
pub async fn insert_bgg_game_list(
    pool: &SqlitePool,
    source: &dyn BggSource,
    bgg_ids: &[i64],
) -> Result<BatchReport> {
    let mut report = BatchReport {
        inserted: Vec::new(),
        skipped: Vec::new(),
    };

    for &bgg_id in bgg_ids {
        let outcome = classify_item(bgg_id, insert_bgg_game(pool, source, bgg_id).await)?;
        match outcome {
            ItemOutcome::Inserted(record) => report.inserted.push(record),
            ItemOutcome::Skipped(skipped) => {
                info!(bgg_id, reason = %skipped.reason, "skipped batch item");
                report.skipped.push(skipped);
            }
        }
    }

    Ok(report)
}

fn classify_item(bgg_id: i64, result: Result<Option<GameRecord>>) -> Result<ItemOutcome> {
    match result {
        Ok(Some(record)) => Ok(ItemOutcome::Inserted(record)),
        Ok(None) => Ok(ItemOutcome::Skipped(SkippedGame {
            bgg_id,
            status: 404,
            reason: "not found".to_string(),
        })),
        Err(Error::Conflict { .. }) => Ok(ItemOutcome::Skipped(SkippedGame {
            bgg_id,
            status: 409,
            reason: "ID or slug already exists".to_string(),
        })),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Source answering from a fixed script; unknown ids are not found
    struct ScriptedSource {
        games: HashMap<i64, GamePayload>,
    }

    impl ScriptedSource {
        fn new(games: impl IntoIterator<Item = (i64, GamePayload)>) -> Self {
            Self {
                games: games.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl BggSource for ScriptedSource {
        async fn fetch_by_id(&self, bgg_id: i64) -> Result<Option<GamePayload>> {
            Ok(self.games.get(&bgg_id).cloned())
        }
    }

    /// Source that fails on a chosen id with an unclassified error
    struct FaultySource {
        inner: ScriptedSource,
        fail_on: i64,
    }

    #[async_trait]
    impl BggSource for FaultySource {
        async fn fetch_by_id(&self, bgg_id: i64) -> Result<Option<GamePayload>> {
            if bgg_id == self.fail_on {
                return Err(Error::Upstream("connection reset".to_string()));
            }
            self.inner.fetch_by_id(bgg_id).await
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        crate::db::schema::initialize_schema(&pool)
            .await
            .expect("Schema initialization failed");

        pool
    }

    fn payload(name: &str, categories: &[&str]) -> GamePayload {
        GamePayload {
            name: vec![name.to_string()],
            min_players: Some(2),
            max_players: Some(4),
            complexity: Some(2.5),
            category: categories.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_game_returns_resolved_record() {
        let pool = test_pool().await;

        let record = insert_game(&pool, &payload("Puerto Rico", &["Strategy", "Economic"]))
            .await
            .expect("Insert failed");

        assert_eq!(record.slug, "puerto-rico");
        assert_eq!(record.name[0].value, "Puerto Rico");
        assert_eq!(record.category.len(), 2);

        let details = games::get_game_details(&pool, "puerto-rico")
            .await
            .unwrap()
            .expect("Should exist");
        assert_eq!(details.id, record.id);
        assert_eq!(details.category[0].id, record.category[0].id);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_category_order() {
        let pool = test_pool().await;

        insert_game(&pool, &payload("Goa", &["Strategy", "Economic"]))
            .await
            .expect("Insert failed");

        let details = games::get_game_details(&pool, "goa")
            .await
            .unwrap()
            .expect("Should exist");
        let values: Vec<&str> = details.category.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, ["Strategy", "Economic"]);
    }

    #[tokio::test]
    async fn test_identical_names_collide_on_derived_slug() {
        let pool = test_pool().await;

        insert_game(&pool, &payload("Terra Mystica", &[])).await.expect("First insert failed");

        let err = insert_game(&pool, &payload("Terra Mystica", &[]))
            .await
            .expect_err("Second insert should conflict");
        assert!(matches!(err, Error::Conflict { field: "slug", .. }));
    }

    #[tokio::test]
    async fn test_duplicate_bgg_id_collides() {
        let pool = test_pool().await;

        let mut first = payload("Goa", &[]);
        first.bgg_id = Some(9216);
        insert_game(&pool, &first).await.expect("First insert failed");

        let mut second = payload("Goa Reprint", &[]);
        second.bgg_id = Some(9216);
        let err = insert_game(&pool, &second)
            .await
            .expect_err("Should conflict on bggId");
        assert!(matches!(err, Error::Conflict { field: "bggId", .. }));
    }

    #[tokio::test]
    async fn test_bgg_not_found_writes_nothing() {
        let pool = test_pool().await;
        let source = ScriptedSource::new([]);

        let result = insert_bgg_game(&pool, &source, 424242)
            .await
            .expect("Lookup itself should not fail");
        assert!(result.is_none());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_batch_classifies_each_item() {
        let pool = test_pool().await;

        // C's payload derives the same slug as an existing game
        insert_game(&pool, &payload("Goa", &[])).await.expect("Seed insert failed");

        let source = ScriptedSource::new([
            (1, payload("Puerto Rico", &["Strategy"])),
            (3, payload("Goa", &[])),
        ]);

        let report = insert_bgg_game_list(&pool, &source, &[1, 2, 3])
            .await
            .expect("Batch should not abort");

        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.inserted[0].slug, "puerto-rico");
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.inserted.len() + report.skipped.len(), 3);

        assert_eq!(report.skipped[0].bgg_id, 2);
        assert_eq!(report.skipped[0].status, 404);
        assert_eq!(report.skipped[0].reason, "not found");

        assert_eq!(report.skipped[1].bgg_id, 3);
        assert_eq!(report.skipped[1].status, 409);
        assert_eq!(report.skipped[1].reason, "ID or slug already exists");
    }

    #[tokio::test]
    async fn test_batch_aborts_on_unclassified_error() {
        let pool = test_pool().await;

        let source = FaultySource {
            inner: ScriptedSource::new([
                (1, payload("Puerto Rico", &[])),
                (3, payload("Agricola", &[])),
            ]),
            fail_on: 2,
        };

        let result = insert_bgg_game_list(&pool, &source, &[1, 2, 3]).await;
        assert!(matches!(result, Err(Error::Upstream(_))));

        // The item before the failure committed; the one after never ran
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_batch_stamps_external_id() {
        let pool = test_pool().await;
        let source = ScriptedSource::new([(9216, payload("Goa", &[]))]);

        let report = insert_bgg_game_list(&pool, &source, &[9216])
            .await
            .expect("Batch failed");

        assert_eq!(report.inserted[0].bgg_id, Some(9216));
    }
}
