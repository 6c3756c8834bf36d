//! Pengajuan Core Library
//!
//! This crate provides the domain model, error types and configuration shared by
//! the submission relay crates.

pub mod config;
pub mod error;
pub mod models;
pub mod naming;

// Re-export commonly used types
pub use config::{BaseConfig, Config, RelayConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use naming::SubmissionStamp;
