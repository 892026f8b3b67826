use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    modes::AnswerRejection,
    state::state_machine::{InvalidSessionTransition, InvalidSongTransition},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A collaborator failed on a path that cannot proceed without it.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// The round cannot be built from its configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The room has no game in progress.
    #[error("no active game in room {0}")]
    NoActiveGame(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidSongTransition> for ServiceError {
    fn from(err: InvalidSongTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<InvalidSessionTransition> for ServiceError {
    fn from(err: InvalidSessionTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<AnswerRejection> for ServiceError {
    fn from(err: AnswerRejection) -> Self {
        match err {
            AnswerRejection::SongNotPlaying
            | AnswerRejection::NotAnswerer
            | AnswerRejection::LockedOut => ServiceError::InvalidState(err.to_string()),
            AnswerRejection::FieldAlreadyFound(_)
            | AnswerRejection::UnsupportedAnswerType(_)
            | AnswerRejection::ChoicesNotOffered(_) => ServiceError::InvalidInput(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid request.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Configuration(message) => AppError::BadRequest(message),
            ServiceError::NoActiveGame(room_id) => {
                AppError::Conflict(format!("no active game in room {room_id}"))
            }
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
