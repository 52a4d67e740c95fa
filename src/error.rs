use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::PollId;

/// Failures a caller of the poll store can see.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Invalid poll: {0}")]
    Validation(String),

    #[error("Poll {0} not found")]
    NotFound(PollId),

    #[error("Option {index} does not exist, the poll has {len} options")]
    InvalidOption { index: usize, len: usize },

    #[error("Already voted in poll {0}")]
    AlreadyVoted(PollId),
}

/// Failures of a persistence backend. These never reach the caller of the
/// store: they are logged and the store carries on with its in-memory copy.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Share link payload could not be decoded: {0}")]
    MalformedBlob(String),

    #[error("Share link carries a malformed poll id: {0:?}")]
    MalformedId(String),

    #[error("Shared poll is not usable: {0}")]
    InvalidDraft(#[from] PollError),
}

/// Error returned by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Poll(PollError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Poll(PollError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Poll(PollError::InvalidOption { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Poll(PollError::AlreadyVoted(_)) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
