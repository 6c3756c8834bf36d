//! Maps a classified downstream result onto the browser response.

use axum::{http::StatusCode, Json};
use pengajuan_core::models::{ApiResponse, ExternalResult, StageWarning};
use serde_json::{json, Value};

/// Builds the `(status, body)` pair for a downstream result.
///
/// `stage` names the downstream operation (`"downstream submit"`) and
/// prefixes failure messages so the UI can tell which step broke. Upload
/// warnings are appended to the message either way.
pub fn relay_response(
    result: ExternalResult,
    stage: &str,
    warnings: &[StageWarning],
) -> (StatusCode, Json<ApiResponse>) {
    let status = StatusCode::from_u16(result.caller_status()).unwrap_or(StatusCode::BAD_GATEWAY);

    let body = match result {
        ExternalResult::Success { message, mut data } => {
            if !warnings.is_empty() {
                if let Value::Object(map) = &mut data {
                    map.insert(
                        "upload_warnings".to_string(),
                        json!(warnings.iter().map(ToString::to_string).collect::<Vec<_>>()),
                    );
                }
            }
            ApiResponse {
                success: true,
                message: with_warnings(message, warnings),
                data: Some(data),
            }
        }
        ExternalResult::ValidationFailure { status, message } => {
            tracing::warn!(stage, upstream_status = status, message = %message, "Downstream rejected request");
            ApiResponse {
                success: false,
                message: with_warnings(format!("{} failed: {}", stage, message), warnings),
                data: Some(json!({ "upstream_status": status })),
            }
        }
        ExternalResult::UnreadableResponse {
            status,
            reason,
            message,
            raw_snippet,
        } => {
            tracing::warn!(
                stage,
                upstream_status = ?status,
                reason = ?reason,
                snippet = %raw_snippet,
                "Downstream response unreadable"
            );
            ApiResponse {
                success: false,
                message: with_warnings(format!("{} failed: {}", stage, message), warnings),
                data: Some(json!({
                    "upstream_status": status,
                    "reason": reason,
                    "raw_snippet": raw_snippet,
                })),
            }
        }
    };

    (status, Json(body))
}

fn with_warnings(message: String, warnings: &[StageWarning]) -> String {
    if warnings.is_empty() {
        return message;
    }
    let joined = warnings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} ({})", message, joined)
}
