//! # Race Backend
//!
//! REST backend for managing races, their racer rosters and per-racer timing.
//! Users register and log in to obtain a bearer token; administrators create
//! races; racers are added to a race, started and finished, and a leaderboard
//! ranks finishers by elapsed time.
//!
//! ## Architecture
//!
//! - [`api`]: identifier types and the data shapes exchanged with clients
//! - [`models`]: users, races, roster entries and timestamp parsing
//! - [`db`]: repository traits with in-memory and Postgres backends
//! - [`services`]: authentication and race management rules
//! - [`config`]: environment configuration
//! - [`http`]: axum router, extractors and handlers (feature `http-server`)

// RepositoryError carries rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
