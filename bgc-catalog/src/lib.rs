//! bgc-catalog library - Board Game Catalog service
//!
//! Games enter the catalog from explicit payloads or from BoardGameGeek
//! lookups, have their many-valued attributes resolved against shared
//! metadata tables, and are exposed through list/detail/bulk-lookup
//! endpoints.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::ingest::BggSource;

pub mod api;
pub mod db;
pub mod ingest;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Upstream game database adapter
    pub bgg: Arc<dyn BggSource>,
    /// Service start time, for the health endpoint
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, bgg: Arc<dyn BggSource>) -> Self {
        Self {
            db,
            bgg,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/api/game", post(api::insert_game_req))
        .route("/api/game/bgg/list", post(api::insert_bgg_game_list_req))
        .route("/api/game/bgg/:bgg_id", post(api::insert_bgg_game_req))
        .route("/api/game/list", get(api::game_list_req))
        .route("/api/game/lookup", post(api::perform_game_lookup_req))
        .route("/api/game/:id_or_slug", get(api::game_details_req))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
