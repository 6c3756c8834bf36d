//! Upload tasks, their outcomes, and the aggregated outbound payload.

use std::fmt;

use serde::Serialize;

/// What a file is, which decides its storage subtree and its failure stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Signature,
    Attachment,
}

impl UploadKind {
    pub fn stage_name(&self) -> &'static str {
        match self {
            UploadKind::Signature => "signature",
            UploadKind::Attachment => "attachment",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stage_name())
    }
}

/// One file to send to the storage gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub data: Vec<u8>,
    pub file_name: String,
    pub path: String,
    pub kind: UploadKind,
}

impl fmt::Debug for UploadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTask")
            .field("bytes", &self.data.len())
            .field("file_name", &self.file_name)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Result of a single gateway upload. Never an `Err`: a failed upload is data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded {
        url: String,
    },
    Failed {
        kind: UploadKind,
        http_status: Option<u16>,
        message: String,
    },
}

impl UploadOutcome {
    pub fn failed(kind: UploadKind, http_status: Option<u16>, message: impl Into<String>) -> Self {
        UploadOutcome::Failed {
            kind,
            http_status,
            message: message.into(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            UploadOutcome::Uploaded { url } => Some(url),
            UploadOutcome::Failed { .. } => None,
        }
    }
}

/// A recorded, non-fatal failure of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageWarning {
    pub stage: UploadKind,
    pub message: String,
}

impl fmt::Display for StageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} upload failed: {}", self.stage, self.message)
    }
}

/// The outbound multipart body for the downstream submission API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedPayload {
    /// Text fields already renamed to the downstream schema
    pub fields: Vec<(String, String)>,
    /// JSON-encoded array of attachment URLs, `[]` when none uploaded
    pub file_paths: String,
    pub ttd_url: Option<String>,
    pub warnings: Vec<StageWarning>,
}

impl AggregatedPayload {
    /// All multipart text parts in send order.
    pub fn form_parts(&self) -> Vec<(String, String)> {
        let mut parts = self.fields.clone();
        parts.push(("file_paths".to_string(), self.file_paths.clone()));
        if let Some(url) = &self.ttd_url {
            parts.push(("ttd_url".to_string(), url.clone()));
        }
        parts
    }

    pub fn file_urls(&self) -> Vec<String> {
        serde_json::from_str(&self.file_paths).unwrap_or_default()
    }

    pub fn warning_for(&self, stage: UploadKind) -> Option<&StageWarning> {
        self.warnings.iter().find(|w| w.stage == stage)
    }
}
