//! Axum router construction.
//!
//! Assembles all routes into a single [`Router`] with permissive CORS so
//! a dashboard served from anywhere can vote and listen.

use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::events;
use crate::handlers;
use crate::state::AppState;

/// Build the complete router.
///
/// The router includes:
/// - `GET`/`POST /vote` -- submit a vote
/// - `GET /results` -- current tallies
/// - `GET /events` -- server-sent event stream
/// - `GET /api/status` -- ballot status
///
/// Every route answers `OPTIONS`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/vote",
            get(handlers::vote)
                .post(handlers::vote)
                .options(handlers::preflight),
        )
        .route(
            "/results",
            get(handlers::results).options(handlers::preflight),
        )
        .route("/events", get(events::events).options(handlers::preflight))
        .route(
            "/api/status",
            get(handlers::status).options(handlers::preflight),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
