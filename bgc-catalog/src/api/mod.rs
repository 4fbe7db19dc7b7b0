//! HTTP API handlers for bgc-catalog

pub mod games;
pub mod health;

pub use games::{
    game_details_req, game_list_req, insert_bgg_game_list_req, insert_bgg_game_req,
    insert_game_req, perform_game_lookup_req,
};
pub use health::health_routes;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bgc_common::api::ApiResponse;
use bgc_common::Error;
use tracing::error;

/// Handler-level error wrapper mapping the taxonomy to status codes
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Database(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Upstream(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self.0);
        }

        (status, Json(ApiResponse::failure(self.0.to_string()))).into_response()
    }
}
