//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use pengajuan_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    crate::telemetry::init_telemetry(json_logs, config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let (state, router) = build_app(&config)?;

    tracing::info!("Configuration loaded and validated successfully");

    Ok((state, router))
}

/// Validate configuration, build relay clients and routes. No global side
/// effects, so tests can build as many apps as they need.
pub fn build_app(config: &Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(config).context("Configuration validation failed")?;

    let state = services::initialize_services(config)?;

    let router = routes::setup_routes(config, state.clone())?;

    Ok((state, router))
}
