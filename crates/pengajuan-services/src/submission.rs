//! Drives every upload of one submission and assembles the downstream payload.
//!
//! Upload failures never abort the pipeline. Each one is recorded as a
//! `StageWarning` and the submission proceeds with whatever URLs were
//! obtained.

use futures::future::join_all;
use pengajuan_core::models::{
    AggregatedPayload, AttachmentFile, SignatureAsset, StageWarning, SubmissionForm, UploadKind,
    UploadOutcome, UploadTask,
};
use pengajuan_core::SubmissionStamp;
use std::sync::Arc;

use crate::gateway::FileUploader;
use crate::signature::{extension_for, SignatureError, SignatureProcessor};

#[derive(Clone)]
pub struct SubmissionAggregator {
    uploader: Arc<dyn FileUploader>,
    signatures: SignatureProcessor,
}

impl SubmissionAggregator {
    pub fn new(uploader: Arc<dyn FileUploader>, signatures: SignatureProcessor) -> Self {
        Self {
            uploader,
            signatures,
        }
    }

    #[tracing::instrument(
        skip(self, form, signature, attachments, stamp, token),
        fields(caller = %stamp.caller(), attachments = attachments.len())
    )]
    pub async fn aggregate(
        &self,
        form: &SubmissionForm,
        signature: Option<SignatureAsset>,
        attachments: Vec<(usize, AttachmentFile)>,
        stamp: &SubmissionStamp,
        token: &str,
    ) -> AggregatedPayload {
        let mut warnings = Vec::new();

        let ttd_url = match signature {
            Some(asset) => match self.upload_signature(asset, stamp, token).await {
                UploadOutcome::Uploaded { url } => Some(url),
                UploadOutcome::Failed { message, .. } => {
                    warnings.push(StageWarning {
                        stage: UploadKind::Signature,
                        message,
                    });
                    None
                }
            },
            None => None,
        };

        let (urls, attachment_warning) = self.upload_attachments(attachments, stamp, token).await;
        warnings.extend(attachment_warning);

        // Vec<String> always serializes.
        let file_paths = serde_json::to_string(&urls).unwrap_or_else(|_| "[]".to_string());

        tracing::info!(
            uploaded_attachments = urls.len(),
            has_signature = ttd_url.is_some(),
            warnings = warnings.len(),
            "Submission uploads aggregated"
        );

        AggregatedPayload {
            fields: form.renamed_fields(),
            file_paths,
            ttd_url,
            warnings,
        }
    }

    /// Resolves, keys and uploads the signature.
    pub async fn upload_signature(
        &self,
        asset: SignatureAsset,
        stamp: &SubmissionStamp,
        token: &str,
    ) -> UploadOutcome {
        let processed = match self.signatures.prepare(asset, token).await {
            Ok(processed) => processed,
            Err(err) => {
                let status = match &err {
                    SignatureError::Source(fetch) => fetch.status(),
                    _ => None,
                };
                return UploadOutcome::failed(UploadKind::Signature, status, err.to_string());
            }
        };

        let extension = extension_for(&processed);
        let task = UploadTask {
            data: processed.data,
            file_name: stamp.signature_file_name(extension),
            path: stamp.path_for(UploadKind::Signature),
            kind: UploadKind::Signature,
        };
        self.uploader.upload(task, token).await
    }

    async fn upload_attachments(
        &self,
        attachments: Vec<(usize, AttachmentFile)>,
        stamp: &SubmissionStamp,
        token: &str,
    ) -> (Vec<String>, Option<StageWarning>) {
        if attachments.is_empty() {
            return (Vec::new(), None);
        }

        let path = stamp.path_for(UploadKind::Attachment);
        let uploads = attachments.into_iter().map(|(slot, file)| {
            let task = UploadTask {
                file_name: stamp.attachment_file_name(slot, &file.extension),
                data: file.data,
                path: path.clone(),
                kind: UploadKind::Attachment,
            };
            async move { (slot, self.uploader.upload(task, token).await) }
        });

        // join_all preserves input order, which is slot order.
        let outcomes = join_all(uploads).await;
        let total = outcomes.len();

        let mut urls = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (slot, outcome) in outcomes {
            match outcome {
                UploadOutcome::Uploaded { url } => urls.push(url),
                UploadOutcome::Failed { message, .. } => {
                    failures.push(format!("slot {}: {}", slot, message))
                }
            }
        }

        let warning = if failures.is_empty() {
            None
        } else if failures.len() == total {
            Some(StageWarning {
                stage: UploadKind::Attachment,
                message: format!("all {} attachments failed ({})", total, failures.join(", ")),
            })
        } else {
            Some(StageWarning {
                stage: UploadKind::Attachment,
                message: failures.join(", "),
            })
        };

        (urls, warning)
    }
}
