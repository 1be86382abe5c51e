//! REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`/`POST` | `/vote?candidate=<name>` | Submit one vote |
//! | `GET` | `/results` | Current tallies ordered by name |
//! | `GET` | `/api/status` | Counters, subscribers, uptime |
//! | `OPTIONS` | any | Bare preflight, `204 No Content` |

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::trace;

use crate::error::ObserverError;
use crate::state::AppState;

/// Query parameters for `/vote`.
#[derive(Debug, serde::Deserialize)]
pub struct VoteQuery {
    /// The candidate to vote for.
    pub candidate: Option<String>,
}

// ---------------------------------------------------------------------------
// /vote
// ---------------------------------------------------------------------------

/// Submit one vote.
///
/// Answers `202 Accepted` as soon as the vote is queued. The tally changes
/// later, when the applier gets to it.
///
/// # Route
///
/// `GET /vote?candidate=<name>` or `POST /vote?candidate=<name>`
pub async fn vote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VoteQuery>,
) -> Result<StatusCode, ObserverError> {
    let candidate = query
        .candidate
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ObserverError::InvalidQuery(String::from("Candidate name is required")))?;

    state.ballot.submit_vote(&candidate)?;
    trace!(%candidate, "Vote accepted");
    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------------
// /results
// ---------------------------------------------------------------------------

/// Current tallies for every candidate.
///
/// # Route
///
/// `GET /results`
pub async fn results(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.ballot.snapshot())
}

// ---------------------------------------------------------------------------
// /api/status
// ---------------------------------------------------------------------------

/// Ballot status for dashboards and health checks.
///
/// # Route
///
/// `GET /api/status`
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.ballot.status().await)
}

/// Plain `OPTIONS` requests that are not CORS preflights.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
