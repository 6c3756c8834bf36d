//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use pengajuan_core::config::{LIST_API_URL, STORAGE_GATEWAY_URL, SUBMISSION_API_URL};
use pengajuan_core::Config;

/// Validate critical configuration values
///
/// Fails fast on values that would make every request misbehave. Missing base
/// URLs are only warned about: each request reports them as a configuration
/// error for the endpoint that needs them.
pub fn validate_config(config: &Config) -> Result<()> {
    // Validate CORS configuration in production
    if config.is_production() && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production - \
            please set specific allowed origins via CORS_ORIGINS environment variable."
        ));
    }

    if config.gateway_timeout_secs() == 0 {
        return Err(anyhow::anyhow!("GATEWAY_TIMEOUT_SECS cannot be 0"));
    }

    if config.downstream_timeout_secs() == 0 {
        return Err(anyhow::anyhow!("DOWNSTREAM_TIMEOUT_SECS cannot be 0"));
    }

    if config.list_max_attempts() == 0 {
        return Err(anyhow::anyhow!("LIST_MAX_ATTEMPTS cannot be 0"));
    }

    if config.ttd_lower_threshold() >= config.ttd_upper_threshold() {
        return Err(anyhow::anyhow!(
            "TTD_LOWER_THRESHOLD ({}) must be below TTD_UPPER_THRESHOLD ({})",
            config.ttd_lower_threshold(),
            config.ttd_upper_threshold()
        ));
    }

    if config.max_attachment_size_bytes() > config.max_request_body_bytes() {
        tracing::warn!(
            max_attachment_size_bytes = config.max_attachment_size_bytes(),
            max_request_body_bytes = config.max_request_body_bytes(),
            "Attachment size limit exceeds request body limit - the body limit wins"
        );
    }

    for (name, value) in [
        (LIST_API_URL, config.list_api_url()),
        (SUBMISSION_API_URL, config.submission_api_url()),
        (STORAGE_GATEWAY_URL, config.storage_gateway_url()),
    ] {
        if value.is_none() {
            tracing::warn!(variable = name, "Base URL not set - dependent endpoints will return 500");
        }
    }

    Ok(())
}
