// ABOUTME: HTTP server for wordledger, exposing text ingestion and word queries over a REST API.
// ABOUTME: Uses Axum with a shared single-writer Ledger; also hosts configuration loading.

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod routes;
pub mod web;

#[cfg(test)]
mod test_support;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, LedgerConfig};
pub use error::ApiError;
pub use routes::create_router;
