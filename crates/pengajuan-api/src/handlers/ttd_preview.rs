//! Signature preview: returns the keyed image without uploading anything.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
};
use bytes::Bytes;
use pengajuan_core::AppError;
use pengajuan_services::SignatureError;
use std::sync::Arc;

use crate::auth::BearerToken;
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::multipart::parse_submission_multipart;

/// `true` when the chroma key was applied, `false` when the original image
/// came back unchanged.
pub const TRANSPARENT_HEADER: &str = "x-ttd-transparent";

#[tracing::instrument(skip_all)]
pub async fn preview_signature(
    token: BearerToken,
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let parts = parse_submission_multipart(multipart?, &state.attachment_validator).await?;
    let asset = parts.signature.ok_or_else(|| {
        AppError::InvalidInput(
            "No signature provided: send a 'ttd' file or a 'ttd_source_url'".to_string(),
        )
    })?;

    state
        .signatures
        .check_source(&asset)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let processed = state
        .signatures
        .prepare(asset, token.as_str())
        .await
        .map_err(preview_error)?;

    tracing::debug!(
        bytes = processed.data.len(),
        transparent = processed.transparent,
        "Signature preview rendered"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(processed.content_type)),
            (
                HeaderName::from_static(TRANSPARENT_HEADER),
                HeaderValue::from_static(if processed.transparent { "true" } else { "false" }),
            ),
        ],
        Bytes::from(processed.data),
    ))
}

fn preview_error(err: SignatureError) -> AppError {
    match err {
        SignatureError::Empty => AppError::InvalidInput(err.to_string()),
        SignatureError::Processing(_) => AppError::Internal(err.to_string()),
        err if err.is_rejected_source() => AppError::InvalidInput(err.to_string()),
        err => AppError::Upstream {
            status: 502,
            message: format!("signature preview failed: {}", err),
        },
    }
}
