//! Storage gateway upload relay.
//!
//! The gateway takes one file per multipart request and answers with ad hoc
//! JSON, or with an HTML page when something in front of it fails. Every
//! response is read as text first and turned into an `UploadOutcome`; nothing
//! here returns an error to the caller.

use anyhow::Result;
use async_trait::async_trait;
use pengajuan_core::models::{body_snippet, UploadKind, UploadOutcome, UploadTask};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::http::{build_client, describe_transport_error, mime_for, TUNNEL_SKIP_HEADER};

/// Multipart field the gateway reads the binary from. Not caller controlled.
pub const GATEWAY_FILE_FIELD: &str = "photo";

/// Uploads one file and reports what happened.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, task: UploadTask, token: &str) -> UploadOutcome;
}

/// `FileUploader` backed by the remote storage gateway.
#[derive(Clone, Debug)]
pub struct StorageGatewayClient {
    client: Client,
    endpoint: String,
}

impl StorageGatewayClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, "storage gateway")?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl FileUploader for StorageGatewayClient {
    async fn upload(&self, task: UploadTask, token: &str) -> UploadOutcome {
        let kind = task.kind;
        let file_name = task.file_name.clone();
        let size = task.data.len();

        let part = match Part::bytes(task.data)
            .file_name(task.file_name.clone())
            .mime_str(mime_for(&task.file_name))
        {
            Ok(part) => part,
            Err(e) => {
                return UploadOutcome::failed(kind, None, format!("Invalid upload part: {}", e))
            }
        };
        let form = Form::new()
            .part(GATEWAY_FILE_FIELD, part)
            .text("path", task.path.clone())
            .text("filename", task.file_name);

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header(TUNNEL_SKIP_HEADER, "true")
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let message = describe_transport_error("Storage gateway", &e);
                tracing::warn!(
                    file_name = %file_name,
                    kind = %kind,
                    error = %e,
                    "Gateway upload did not get a response"
                );
                return UploadOutcome::failed(kind, None, message);
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return UploadOutcome::failed(
                    kind,
                    Some(status),
                    format!("Failed to read storage gateway response: {}", e),
                )
            }
        };

        let outcome = parse_gateway_response(status, &body, kind);
        match &outcome {
            UploadOutcome::Uploaded { url } => tracing::debug!(
                file_name = %file_name,
                path = %task.path,
                kind = %kind,
                bytes = size,
                url = %url,
                "File uploaded to storage gateway"
            ),
            UploadOutcome::Failed { message, .. } => tracing::warn!(
                file_name = %file_name,
                path = %task.path,
                kind = %kind,
                status,
                message = %message,
                "Storage gateway rejected upload"
            ),
        }
        outcome
    }
}

/// Turns a raw gateway response into an outcome.
///
/// Success requires a 2xx status, `success: true` and a file URL. Otherwise the
/// gateway's own `message` is kept verbatim when it sent one.
pub fn parse_gateway_response(status: u16, body: &str, kind: UploadKind) -> UploadOutcome {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => {
            return UploadOutcome::failed(
                kind,
                Some(status),
                format!(
                    "Storage gateway returned a non-JSON response (HTTP {}): {}",
                    status,
                    body_snippet(body)
                ),
            )
        }
    };

    let success = json.get("success").and_then(Value::as_bool).unwrap_or(false);
    let status_ok = (200..300).contains(&status);
    if let (true, true, Some(url)) = (success, status_ok, resolve_file_url(&json)) {
        return UploadOutcome::Uploaded { url };
    }

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if success && status_ok {
                "Storage gateway reported success without a file URL".to_string()
            } else {
                format!("Storage gateway rejected the upload (HTTP {})", status)
            }
        });
    UploadOutcome::failed(kind, Some(status), message)
}

/// Gateway versions disagree on where the URL lives.
fn resolve_file_url(json: &Value) -> Option<String> {
    const DATA_KEYS: [&str; 3] = ["fileUrl", "url", "file_url"];
    const ROOT_KEYS: [&str; 2] = ["fileUrl", "url"];

    let data = json.get("data");
    DATA_KEYS
        .iter()
        .filter_map(|key| data.and_then(|d| d.get(key)))
        .chain(ROOT_KEYS.iter().filter_map(|key| json.get(key)))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(str::to_string)
}
