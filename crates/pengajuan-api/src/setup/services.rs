//! Relay client construction

use anyhow::{Context, Result};
use pengajuan_core::Config;
use pengajuan_processing::{AttachmentValidator, TransparencyThresholds};
use pengajuan_services::{
    DownstreamClient, RemoteImageFetcher, RetryPolicy, RetryingFetcher, SignatureProcessor,
    SourceAllowList, StorageGatewayClient, SubmissionAggregator,
};
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Build every outbound client and wrap them in the shared state.
pub fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let gateway_timeout = Duration::from_secs(config.gateway_timeout_secs());
    let downstream_timeout = Duration::from_secs(config.downstream_timeout_secs());

    let downstream = DownstreamClient::new(downstream_timeout)?;

    // Signature sources live next to the gateway: they share its timeout and
    // the gateway's own origin is always allowed.
    let allowed_sources = SourceAllowList::new(
        config
            .ttd_source_allowed_origins()
            .iter()
            .map(String::as_str)
            .chain(config.storage_gateway_url()),
    )
    .context("Invalid signature source origin in TTD_SOURCE_ALLOWED_ORIGINS or STORAGE_GATEWAY_URL")?;
    let allowed_source_count = allowed_sources.len();
    let fetcher = RemoteImageFetcher::new(gateway_timeout, allowed_sources)?;
    let thresholds =
        TransparencyThresholds::new(config.ttd_upper_threshold(), config.ttd_lower_threshold());
    let signatures = SignatureProcessor::new(fetcher, thresholds);

    let aggregator = match config.storage_gateway_url() {
        Some(url) => {
            let gateway = StorageGatewayClient::new(url, gateway_timeout)
                .context("Failed to initialize storage gateway client")?;
            Some(SubmissionAggregator::new(Arc::new(gateway), signatures.clone()))
        }
        None => None,
    };

    let policy = RetryPolicy::new(
        config.list_max_attempts(),
        Duration::from_millis(config.list_retry_base_ms()),
    );

    let attachment_validator = AttachmentValidator::new(
        config.max_attachment_size_bytes(),
        config.attachment_allowed_extensions().to_vec(),
    );

    tracing::info!(
        gateway_configured = aggregator.is_some(),
        submission_configured = config.submission_api_url().is_some(),
        list_configured = config.list_api_url().is_some(),
        gateway_timeout_secs = config.gateway_timeout_secs(),
        downstream_timeout_secs = config.downstream_timeout_secs(),
        list_max_attempts = policy.max_attempts,
        ttd_source_origins = allowed_source_count,
        "Relay clients initialized"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        downstream,
        list_fetcher: RetryingFetcher::new(policy),
        signatures,
        attachment_validator,
        aggregator,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pengajuan_core::RelayConfig;

    #[test]
    fn test_invalid_signature_origin_fails_startup() {
        let mut relay = RelayConfig::default();
        relay.ttd_source_allowed_origins = vec!["cdn.example.com".to_string()];
        let Err(err) = initialize_services(&Config(Box::new(relay))) else {
            panic!("Expected startup to fail on a bare host name");
        };
        assert!(err.to_string().contains("TTD_SOURCE_ALLOWED_ORIGINS"));
    }

    #[test]
    fn test_gateway_only_configuration_builds() {
        let mut relay = RelayConfig::default();
        relay.storage_gateway_url = Some("https://gateway.example.com/upload".to_string());
        let Ok(state) = initialize_services(&Config(Box::new(relay))) else {
            panic!("Expected services to build");
        };
        assert!(state.aggregator().is_ok());
    }
}
