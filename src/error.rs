use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A negative quantity reached the aggregation. The write path is
    /// supposed to reject these, so treat it as a data-integrity fault
    /// rather than emitting negative or >100% percentages.
    #[error("negative vote quantity {quantity} for nominee {nominee_id}")]
    InvalidVoteQuantity { nominee_id: i64, quantity: i64 },

    #[error("category {0} not found")]
    NotFound(i64),

    #[error("vote store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    /// Degraded mode only: the coordinator swallows this and falls through
    /// to the store, so it never reaches a caller in practice.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("failed to serialize summary: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidVoteQuantity { .. }
            | AppError::CacheUnavailable(_)
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("request failed: {self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
