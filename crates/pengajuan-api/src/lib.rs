//! Pengajuan API Library
//!
//! This crate provides the HTTP handlers, request extractors and application
//! setup for the submission relay.

// Module declarations
mod handlers;
mod response;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use error::HttpAppError;
pub use state::AppState;
