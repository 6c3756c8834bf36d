//! Inbound submission model: text fields, attachment slots and the signature.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of attachment slots a submission can carry.
pub const MAX_ATTACHMENTS: usize = 4;

/// Client fields that must be non-empty before any outbound call is made.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "hal_id",
    "kepada",
    "satker_id",
    "kode_barang",
    "deskripsi",
    "nama_pelapor",
    "npp_pelapor",
    "nama_atasan",
    "npp_atasan",
];

/// Client field name -> downstream field name. Anything not listed here never
/// reaches the downstream API.
pub const FIELD_RENAMES: [(&str, &str); 10] = [
    ("hal_id", "id_hal"),
    ("kepada", "kepada_id"),
    ("satker_id", "id_satker"),
    ("kode_barang", "kd_barang"),
    ("deskripsi", "keterangan"),
    ("nama_pelapor", "pelapor_nama"),
    ("npp_pelapor", "pelapor_npp"),
    ("nama_atasan", "atasan_nama"),
    ("npp_atasan", "atasan_npp"),
    ("catatan", "catatan"),
];

/// Text fields of a work-order submission, keyed by client field name.
///
/// Unknown fields are kept as received; they are filtered out only when the
/// outbound payload is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionForm {
    fields: BTreeMap<String, String>,
}

impl SubmissionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Required fields that are absent or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|name| self.get(name).map_or(true, |v| v.trim().is_empty()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            return Ok(());
        }
        Err(AppError::InvalidInput(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }

    /// Identity of the reporter, embedded in generated file names.
    pub fn caller_identity(&self) -> Option<&str> {
        self.get("npp_pelapor").filter(|v| !v.trim().is_empty())
    }

    /// Fields renamed to the downstream schema, in rename-table order.
    pub fn renamed_fields(&self) -> Vec<(String, String)> {
        FIELD_RENAMES
            .iter()
            .filter_map(|(client, downstream)| {
                self.get(client)
                    .map(|value| (downstream.to_string(), value.to_string()))
            })
            .collect()
    }
}

/// A file bound to an attachment slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub data: Vec<u8>,
    /// Declared extension, lowercase, without the dot
    pub extension: String,
    pub original_filename: String,
}

/// Ordinal attachment position (0..MAX_ATTACHMENTS) with an optional file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentSlot {
    pub index: usize,
    pub file: Option<AttachmentFile>,
}

/// The four attachment slots of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSlots {
    slots: Vec<AttachmentSlot>,
}

impl Default for AttachmentSlots {
    fn default() -> Self {
        Self {
            slots: (0..MAX_ATTACHMENTS)
                .map(|index| AttachmentSlot { index, file: None })
                .collect(),
        }
    }
}

impl AttachmentSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a file to an explicit slot.
    pub fn bind(&mut self, index: usize, file: AttachmentFile) -> Result<(), AppError> {
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Attachment slot {} is out of range (0..{})",
                index,
                MAX_ATTACHMENTS - 1
            ))
        })?;
        if slot.file.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Attachment slot {} is already filled",
                index
            )));
        }
        slot.file = Some(file);
        Ok(())
    }

    /// Bind a file to the first free slot.
    pub fn push(&mut self, file: AttachmentFile) -> Result<usize, AppError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.file.is_none())
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "At most {} attachments are allowed",
                    MAX_ATTACHMENTS
                ))
            })?;
        slot.file = Some(file);
        Ok(slot.index)
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.file.is_some()).count()
    }

    /// Hands out the bound files in slot order, consuming the slots.
    pub fn into_bound(self) -> Vec<(usize, AttachmentFile)> {
        self.slots
            .into_iter()
            .filter_map(|slot| slot.file.map(|file| (slot.index, file)))
            .collect()
    }
}

/// The reporter's signature as received from the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAsset {
    /// Raw image bytes from the multipart body
    Inline(Vec<u8>),
    /// Reference to an image behind an authorized endpoint
    Remote(String),
}
