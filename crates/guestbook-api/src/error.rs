use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use guestbook_chain::{Revert, SubmitError};
use guestbook_types::api::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("transaction rejected: {0}")]
    Rejected(Revert),

    #[error("call reverted: {0}")]
    Reverted(Revert),

    #[error("transaction already known")]
    Duplicate,

    #[error("pending pool is full")]
    Busy,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(revert) => ApiError::Rejected(revert),
            SubmitError::Duplicate => ApiError::Duplicate,
            SubmitError::PoolFull(_) => ApiError::Busy,
            SubmitError::Storage(e) => ApiError::Internal(e),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", err);
        ApiError::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Rejected(_) | ApiError::Reverted(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Duplicate => StatusCode::CONFLICT,
            ApiError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
