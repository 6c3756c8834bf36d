//! Shared reqwest plumbing.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// Header that asks the tunneling proxy in front of the upstream services to
/// skip its browser warning page.
pub const TUNNEL_SKIP_HEADER: &str = "ngrok-skip-browser-warning";

/// Builds a client with its own timeout; every external dependency gets one.
pub fn build_client(timeout: Duration, purpose: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .with_context(|| format!("Failed to create HTTP client for {}", purpose))
}

/// Human-readable description of a transport failure.
pub fn describe_transport_error(target: &str, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("{} request timed out", target)
    } else if err.is_connect() {
        format!("{} is unreachable: {}", target, err)
    } else {
        format!("{} request failed: {}", target, err)
    }
}

/// Content type for an upload, keyed by file extension.
pub fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or_default();
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
