//! Shared type definitions for the live ballot service.
//!
//! Types defined here are the wire contract between the ballot core, the
//! HTTP layer, and the browser dashboard. They flow downstream to
//! `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for subscriber handles
//! - [`structs`] -- Candidate records and status payloads

pub mod ids;
pub mod structs;

pub use ids::SubscriberId;
pub use structs::{BallotCounters, BallotStatus, Candidate};
