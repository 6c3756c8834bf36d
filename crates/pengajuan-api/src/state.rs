//! Application state shared by every handler.

use pengajuan_core::{AppError, Config};
use pengajuan_processing::AttachmentValidator;
use pengajuan_services::{DownstreamClient, RetryingFetcher, SignatureProcessor, SubmissionAggregator};

/// Relay clients are built once at startup; each carries its own timeout.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub downstream: DownstreamClient,
    pub list_fetcher: RetryingFetcher,
    pub signatures: SignatureProcessor,
    pub attachment_validator: AttachmentValidator,
    /// Absent when `STORAGE_GATEWAY_URL` is unset
    pub aggregator: Option<SubmissionAggregator>,
}

impl AppState {
    pub fn aggregator(&self) -> Result<&SubmissionAggregator, AppError> {
        let url = self.config.require_storage_gateway_url()?;
        self.aggregator.as_ref().ok_or_else(|| {
            AppError::Internal(format!("Storage gateway client for {} was not built", url))
        })
    }
}
