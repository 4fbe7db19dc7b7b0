//! Shared API request/response types
//!
//! Every BGC endpoint answers with the same envelope: a success flag, a
//! human-readable message, and (on success) the result payload.

use serde::Serialize;

/// Response envelope shared by all endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request succeeded
    pub success: bool,
    /// Human-readable outcome message
    pub message: String,
    /// Result payload (omitted on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying a payload
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Failure response; the status code travels on the HTTP layer
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
