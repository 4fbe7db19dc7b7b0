//! Game ingestion and lookup endpoints
//!
//! All handlers answer with the shared `{success, message, data}`
//! envelope; failures carry the mapped status code via `ApiError`.

use axum::extract::{Path, State};
use axum::Json;
use bgc_common::api::ApiResponse;
use bgc_common::Error;
use serde_json::Value;

use crate::api::ApiError;
use crate::db::games::{self, GameLookupEntry, GameRecord, GameSummary};
use crate::ingest::{self, BatchReport, GamePayload};
use crate::AppState;

/// POST /api/game
///
/// Insert a new game from an explicit payload: validates scalars, resolves
/// every metadata attribute against the catalog, and commits the full
/// record. Answers with the created record including resolved ids.
pub async fn insert_game_req(
    State(state): State<AppState>,
    Json(payload): Json<GamePayload>,
) -> Result<Json<ApiResponse<GameRecord>>, ApiError> {
    let record = ingest::insert_game(&state.db, &payload).await?;

    let message = format!("added game {}", record.id);
    Ok(Json(ApiResponse::ok(message, record)))
}

/// POST /api/game/bgg/:bggId
///
/// Look up a game on BGG and insert it. The result is the same as adding
/// the game with an explicit body.
pub async fn insert_bgg_game_req(
    State(state): State<AppState>,
    Path(bgg_id): Path<i64>,
) -> Result<Json<ApiResponse<GameRecord>>, ApiError> {
    let record = ingest::insert_bgg_game(&state.db, state.bgg.as_ref(), bgg_id)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("BGG has no record of game with ID {}", bgg_id))
        })?;

    let message = format!("added game {}", record.id);
    Ok(Json(ApiResponse::ok(message, record)))
}

/// POST /api/game/bgg/list
///
/// Insert a list of games by BGG id. Items that are unknown upstream or
/// already in the catalog are reported in `skipped`; anything else fails
/// the whole request.
pub async fn insert_bgg_game_list_req(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<BatchReport>>, ApiError> {
    let bgg_ids = parse_id_list(&body)?;

    let report = ingest::insert_bgg_game_list(&state.db, state.bgg.as_ref(), &bgg_ids).await?;

    let message = format!(
        "inserted {} games of {}",
        report.inserted.len(),
        bgg_ids.len()
    );
    Ok(Json(ApiResponse::ok(message, report)))
}

/// GET /api/game/list
pub async fn game_list_req(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<GameSummary>>>, ApiError> {
    let result = games::get_game_list(&state.db).await?;

    let message = format!("found {} games", result.len());
    Ok(Json(ApiResponse::ok(message, result)))
}

/// POST /api/game/lookup
///
/// Body is an array of game ids or slugs; answers with `{id, slug}` for
/// every match, silently omitting unmatched keys.
pub async fn perform_game_lookup_req(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<Vec<GameLookupEntry>>>, ApiError> {
    let keys = parse_key_list(&body)?;

    let result = games::perform_game_lookup(&state.db, &keys).await?;

    let message = format!("looked up {} games", result.len());
    Ok(Json(ApiResponse::ok(message, result)))
}

/// GET /api/game/:idOrSlug
pub async fn game_details_req(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<ApiResponse<GameRecord>>, ApiError> {
    let record = games::get_game_details(&state.db, &id_or_slug)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no such game {}", id_or_slug)))?;

    let message = format!("information on game {}", id_or_slug);
    Ok(Json(ApiResponse::ok(message, record)))
}

fn parse_id_list(body: &Value) -> Result<Vec<i64>, ApiError> {
    let items = body.as_array().ok_or_else(|| {
        Error::InvalidInput("request body should be an array of BGG ids".to_string())
    })?;

    items
        .iter()
        .map(|item| {
            item.as_i64().ok_or_else(|| {
                ApiError::from(Error::InvalidInput(format!(
                    "BGG id {} is not an integer",
                    item
                )))
            })
        })
        .collect()
}

fn parse_key_list(body: &Value) -> Result<Vec<String>, ApiError> {
    let items = body.as_array().ok_or_else(|| {
        Error::InvalidInput("request body should be an array of ids or slugs".to_string())
    })?;

    items
        .iter()
        .map(|item| match item {
            Value::String(key) => Ok(key.clone()),
            Value::Number(key) => Ok(key.to_string()),
            other => Err(ApiError::from(Error::InvalidInput(format!(
                "lookup key {} is not an id or slug",
                other
            )))),
        })
        .collect()
}
