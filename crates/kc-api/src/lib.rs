//! # kc-api
//!
//! REST API server for Cluster Claimer.
//!
//! This crate exposes lease creation and release over HTTP, plus health,
//! inventory and Prometheus endpoints.

pub mod auth;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

#[cfg(test)]
mod test_helpers;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
