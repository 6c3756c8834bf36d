//! Multipart parsing for submission requests

use axum::extract::Multipart;
use pengajuan_core::models::{AttachmentFile, AttachmentSlots, SignatureAsset, SubmissionForm};
use pengajuan_processing::AttachmentValidator;

use crate::error::HttpAppError;

const ATTACHMENT_FIELD: &str = "lampiran";
const SIGNATURE_FIELD: &str = "ttd";
const SIGNATURE_URL_FIELD: &str = "ttd_source_url";

/// Everything a submission request carried, before any upload happens.
#[derive(Debug, Default)]
pub struct SubmissionParts {
    pub form: SubmissionForm,
    pub attachments: AttachmentSlots,
    pub signature: Option<SignatureAsset>,
}

#[derive(Debug, PartialEq, Eq)]
enum PartName {
    /// `lampiran_<n>` binds slot n, `lampiran` / `lampiran[]` takes the next free one
    Attachment(Option<usize>),
    Signature,
    SignatureUrl,
    Text,
}

fn classify_part(name: &str) -> PartName {
    if name == ATTACHMENT_FIELD || name == "lampiran[]" {
        return PartName::Attachment(None);
    }
    if let Some(slot) = name
        .strip_prefix("lampiran_")
        .and_then(|n| n.parse::<usize>().ok())
    {
        return PartName::Attachment(Some(slot));
    }
    match name {
        SIGNATURE_FIELD => PartName::Signature,
        SIGNATURE_URL_FIELD => PartName::SignatureUrl,
        _ => PartName::Text,
    }
}

/// Reads the whole body. Attachments are validated as they arrive so a bad
/// file is rejected before any gateway call.
pub async fn parse_submission_multipart(
    mut multipart: Multipart,
    validator: &AttachmentValidator,
) -> Result<SubmissionParts, HttpAppError> {
    let mut parts = SubmissionParts::default();
    let mut signature_inline: Option<Vec<u8>> = None;
    let mut signature_url: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match classify_part(&name) {
            PartName::Attachment(slot) => {
                let original_filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                // Browsers send untouched file inputs as empty parts.
                if data.is_empty() {
                    continue;
                }
                let extension = validator.validate_all(&original_filename, data.len())?;
                let file = AttachmentFile {
                    data: data.to_vec(),
                    extension,
                    original_filename,
                };
                match slot {
                    Some(index) => parts.attachments.bind(index, file)?,
                    None => {
                        parts.attachments.push(file)?;
                    }
                }
            }
            PartName::Signature => {
                let data = field.bytes().await?;
                if !data.is_empty() {
                    signature_inline = Some(data.to_vec());
                }
            }
            PartName::SignatureUrl => {
                let url = field.text().await?;
                let url = url.trim();
                if !url.is_empty() {
                    signature_url = Some(url.to_string());
                }
            }
            PartName::Text => {
                let value = field.text().await?;
                parts.form.insert(name, value);
            }
        }
    }

    // An uploaded file wins over a reference.
    parts.signature = signature_inline
        .map(SignatureAsset::Inline)
        .or(signature_url.map(SignatureAsset::Remote));

    tracing::debug!(
        fields = parts.form.len(),
        attachments = parts.attachments.filled(),
        has_signature = parts.signature.is_some(),
        "Submission multipart parsed"
    );

    Ok(parts)
}
