//! Classified outcome of a call to the downstream submission/listing API.

use serde::Serialize;
use serde_json::Value;

/// Longest body excerpt kept on failure variants.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Why a response body could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreadableReason {
    /// HTML interstitial from the tunneling proxy
    TunnelBlocked,
    /// Neither JSON nor a recognised interstitial
    UnknownFormat,
    /// No response at all: connect error, reset or timeout
    Transport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalResult {
    Success {
        message: String,
        data: Value,
    },
    ValidationFailure {
        status: u16,
        message: String,
    },
    UnreadableResponse {
        status: Option<u16>,
        reason: UnreadableReason,
        message: String,
        raw_snippet: String,
    },
}

impl ExternalResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExternalResult::Success { .. })
    }

    /// HTTP status received from upstream, if any. Successes report none.
    pub fn status(&self) -> Option<u16> {
        match self {
            ExternalResult::Success { .. } => None,
            ExternalResult::ValidationFailure { status, .. } => Some(*status),
            ExternalResult::UnreadableResponse { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ExternalResult::Success { message, .. }
            | ExternalResult::ValidationFailure { message, .. }
            | ExternalResult::UnreadableResponse { message, .. } => message,
        }
    }

    /// 401/403 from upstream: the credential is bad and retrying cannot help.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Status to answer the browser with.
    pub fn caller_status(&self) -> u16 {
        match self {
            ExternalResult::Success { .. } => 200,
            ExternalResult::ValidationFailure { status, .. } if *status >= 400 => *status,
            ExternalResult::ValidationFailure { .. } => 422,
            ExternalResult::UnreadableResponse { .. } => 502,
        }
    }
}

/// Truncates `body` to at most `SNIPPET_MAX_CHARS` characters.
pub fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
