//! HTTP API and server-sent event stream for the live ballot service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Vote intake** (`GET`/`POST /vote?candidate=<name>`) answering
//!   `202 Accepted` without waiting for the vote to be applied
//! - **Results** (`GET /results`) as a JSON array ordered by name
//! - **Event stream** (`GET /events`) pushing a full snapshot followed by
//!   one record per tally change, with comment keep-alives
//! - **Status** (`GET /api/status`) with counters and subscriber count
//!
//! # Architecture
//!
//! Handlers never touch the tally directly. Votes go through
//! [`Ballot::submit_vote`](ballot_core::Ballot::submit_vote), reads come
//! from the snapshot cell, and every `/events` connection runs its own
//! session loop over a channel-backed transport.

pub mod error;
pub mod events;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{start_server, ServerError};
pub use startup::{spawn_observer, StartupError};
pub use state::AppState;
