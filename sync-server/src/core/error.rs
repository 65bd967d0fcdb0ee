//! Unified Error Handling
//!
//! Application-wide error types and the API response envelope.
//!
//! # Error code convention
//!
//! | Prefix | Category | Example |
//! |--------|----------|---------|
//! | E0xxx  | Request / business errors | E0003 not found |
//! | E4xxx  | Upstream / pipeline errors | E4001 remote fetch failed |
//! | E9xxx  | System errors | E9002 database error |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Unified API response structure
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application-level error type
///
/// Pipeline failure semantics (see the orchestrator for how these are
/// applied): `RemoteFetch` aborts a sync run, `Download` is isolated and
/// counted, `ParseAnomaly` aborts a run whose document parsed to nothing
/// renderable (malformed individual sections degrade inside the parser
/// instead), `PartitionUnavailable` is fatal to the triggering operation and
/// is never retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Request Errors ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    // ========== Pipeline Errors ==========
    #[error("Tenant partition unavailable: {0}")]
    PartitionUnavailable(String),

    #[error("Remote fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Media download failed: {0}")]
    Download(String),

    #[error("Parse anomaly: {0}")]
    ParseAnomaly(String),

    // ========== System Errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn partition_unavailable(msg: impl Into<String>) -> Self {
        Self::PartitionUnavailable(msg.into())
    }

    pub fn remote_fetch(msg: impl Into<String>) -> Self {
        Self::RemoteFetch(msg.into())
    }

    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn parse_anomaly(msg: impl Into<String>) -> Self {
        Self::ParseAnomaly(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),

            // Validation (400)
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),

            // Partition unavailable (503)
            AppError::PartitionUnavailable(msg) => {
                error!(target: "partition", error = %msg, "Tenant partition unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "E4003", "Tenant data unavailable")
            }

            // Upstream storefront errors (502)
            AppError::RemoteFetch(msg) => {
                error!(target: "remote", error = %msg, "Storefront fetch failed");
                (StatusCode::BAD_GATEWAY, "E4001", "Upstream storefront error")
            }

            // Media download errors never reach a response on their own; if
            // one does, treat it as an upstream failure (502)
            AppError::Download(msg) => (StatusCode::BAD_GATEWAY, "E4002", msg.as_str()),

            // A document with nothing renderable in it (422)
            AppError::ParseAnomaly(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "E0005", msg.as_str()),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9002", "Database error")
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9001", "Internal server error")
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<surrealdb::Error> for AppError {
    fn from(e: surrealdb::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::RemoteFetch(e.to_string())
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}
