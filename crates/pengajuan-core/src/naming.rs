//! Deterministic storage paths and file names for one submission.
//!
//! A `SubmissionStamp` is taken once when the request arrives and threaded
//! through every upload task, so all files of one submission share the same
//! timestamp and caller identity and differ only by slot.

use chrono::{DateTime, Datelike, Utc};

use crate::models::UploadKind;

pub const STORAGE_ROOT: &str = "work-order";
pub const ATTACHMENT_PREFIX: &str = "pengajuan";
pub const SIGNATURE_PREFIX: &str = "ttd";

const MAX_IDENTITY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionStamp {
    at: DateTime<Utc>,
    caller: String,
}

impl SubmissionStamp {
    pub fn new(caller: Option<&str>) -> Self {
        Self::at(Utc::now(), caller)
    }

    pub fn at(at: DateTime<Utc>, caller: Option<&str>) -> Self {
        Self {
            at,
            caller: sanitize_identity(caller.unwrap_or_default()),
        }
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    /// Gateway destination folder, always with a trailing slash.
    pub fn path_for(&self, kind: UploadKind) -> String {
        match kind {
            UploadKind::Attachment => format!(
                "{}/{}/{:02}/",
                STORAGE_ROOT,
                self.at.year(),
                self.at.month()
            ),
            UploadKind::Signature => format!(
                "{}/{}/{}/{:02}/",
                STORAGE_ROOT,
                SIGNATURE_PREFIX,
                self.at.year(),
                self.at.month()
            ),
        }
    }

    pub fn attachment_file_name(&self, slot: usize, extension: &str) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            ATTACHMENT_PREFIX,
            self.caller,
            self.compact_time(),
            slot,
            extension.trim_start_matches('.').to_lowercase()
        )
    }

    /// `extension` is `png` unless transparency fell back to the original image.
    pub fn signature_file_name(&self, extension: &str) -> String {
        format!(
            "{}_{}_{}.{}",
            SIGNATURE_PREFIX,
            self.caller,
            self.compact_time(),
            extension.trim_start_matches('.').to_lowercase()
        )
    }

    fn compact_time(&self) -> String {
        self.at.format("%Y%m%d%H%M%S%3f").to_string()
    }
}

fn sanitize_identity(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .take(MAX_IDENTITY_LEN)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}
