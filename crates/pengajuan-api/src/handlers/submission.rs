//! Submission endpoint: form + files in, one downstream record out.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::IntoResponse,
};
use pengajuan_core::{AppError, SubmissionStamp};
use std::sync::Arc;

use crate::auth::BearerToken;
use crate::error::HttpAppError;
use crate::response::relay_response;
use crate::state::AppState;
use crate::utils::multipart::parse_submission_multipart;

const STAGE: &str = "downstream submit";

/// Runs the full pipeline: validate, upload signature then attachments,
/// post the aggregated payload and relay the classified result.
#[tracing::instrument(skip_all)]
pub async fn create_submission(
    token: BearerToken,
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    // Configuration first: nothing is read or uploaded against a missing host.
    let submission_url = state.config.require_submission_api_url()?;
    let aggregator = state.aggregator()?;

    let parts = parse_submission_multipart(multipart?, &state.attachment_validator).await?;
    parts.form.validate()?;
    if let Some(asset) = &parts.signature {
        state
            .signatures
            .check_source(asset)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    }

    let stamp = SubmissionStamp::new(parts.form.caller_identity());
    tracing::info!(
        caller = %stamp.caller(),
        attachments = parts.attachments.filled(),
        has_signature = parts.signature.is_some(),
        "Submission received"
    );

    let payload = aggregator
        .aggregate(
            &parts.form,
            parts.signature,
            parts.attachments.into_bound(),
            &stamp,
            token.as_str(),
        )
        .await;

    let result = state
        .downstream
        .submit(submission_url, &payload, token.as_str())
        .await;

    Ok(relay_response(result, STAGE, &payload.warnings))
}
