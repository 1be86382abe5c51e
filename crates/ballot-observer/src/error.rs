//! Error types for the HTTP layer.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ballot_core::BallotError;

/// Errors that can occur in the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An invalid or missing query parameter.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The ballot cannot take the request right now.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BallotError> for ObserverError {
    fn from(err: BallotError) -> Self {
        match err {
            BallotError::Busy => Self::Unavailable(String::from("Server is busy, try again later")),
            BallotError::ShutdownInProgress => {
                Self::Unavailable(String::from("Server is shutting down"))
            }
            BallotError::UnknownCandidate(name) => {
                Self::NotFound(format!("unknown candidate: {name}"))
            }
            BallotError::Serialization(e) => Self::Serialization(e),
            BallotError::TransportFailure(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
            Self::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
