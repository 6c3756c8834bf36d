//! Downstream submission/listing API relay.
//!
//! The downstream deployment sits behind an HTTP tunnel that sometimes answers
//! with its own HTML warning page. Bodies are always read as text and handed
//! to `classify_response`, which tells a tunnel interstitial apart from other
//! unreadable bodies and from genuine JSON rejections.

use anyhow::Result;
use pengajuan_core::models::{body_snippet, AggregatedPayload, ExternalResult, UnreadableReason};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use crate::http::{build_client, describe_transport_error, TUNNEL_SKIP_HEADER};

/// Lowercase substrings that identify the tunneling proxy's interstitial.
const TUNNEL_MARKERS: [&str; 3] = ["ngrok", "err_ngrok", "tunnel"];

#[derive(Clone, Debug)]
pub struct DownstreamClient {
    client: Client,
}

impl DownstreamClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, "downstream API")?,
        })
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header("Accept", "application/json")
            .header(TUNNEL_SKIP_HEADER, "true")
    }

    /// POST the aggregated payload. Never retried here: the downstream contract
    /// has no idempotency key.
    pub async fn submit(&self, url: &str, payload: &AggregatedPayload, token: &str) -> ExternalResult {
        let form = payload
            .form_parts()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        let request = self.authorized(self.client.post(url), token).multipart(form);
        let result = self.execute(request, "Downstream submission API").await;
        tracing::info!(
            success = result.is_success(),
            status = ?result.status(),
            "Downstream submission completed"
        );
        result
    }

    /// GET the submission list.
    pub async fn list(&self, url: &str, token: &str) -> ExternalResult {
        let request = self.authorized(self.client.get(url), token);
        self.execute(request, "Downstream listing API").await
    }

    async fn execute(&self, request: RequestBuilder, target: &str) -> ExternalResult {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, target = target, "Downstream call failed");
                return transport_failure(target, &e);
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => classify_response(status, &body),
            Err(e) => ExternalResult::UnreadableResponse {
                status: Some(status),
                reason: UnreadableReason::Transport,
                message: format!("{} response could not be read: {}", target, e),
                raw_snippet: String::new(),
            },
        }
    }
}

fn transport_failure(target: &str, err: &reqwest::Error) -> ExternalResult {
    ExternalResult::UnreadableResponse {
        status: err.status().map(|s| s.as_u16()),
        reason: UnreadableReason::Transport,
        message: describe_transport_error(target, err),
        raw_snippet: String::new(),
    }
}

/// Classifies a raw downstream response.
///
/// 1. Body that is not JSON: tunnel interstitial or unknown format.
/// 2. JSON with a non-2xx status or `success: false`: validation failure carrying
///    the upstream message, plus a note when status and body disagree.
/// 3. Anything else: success.
pub fn classify_response(status: u16, body: &str) -> ExternalResult {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => return classify_unreadable(status, body),
    };

    let status_ok = (200..300).contains(&status);
    let body_flag = json.get("success").and_then(Value::as_bool);
    let body_message = json
        .get("message")
        .or_else(|| json.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if status_ok && body_flag != Some(false) {
        let data = json.get("data").cloned().unwrap_or_else(|| json.clone());
        return ExternalResult::Success {
            message: body_message.unwrap_or_else(|| "OK".to_string()),
            data,
        };
    }

    let mut message = body_message
        .unwrap_or_else(|| format!("Downstream rejected the request (HTTP {})", status));
    match (status_ok, body_flag) {
        (true, Some(false)) => message.push_str(&format!(
            " (HTTP {} but response body reported success=false)",
            status
        )),
        (false, Some(true)) => message.push_str(&format!(
            " (response body reported success=true but HTTP status was {})",
            status
        )),
        _ => {}
    }

    ExternalResult::ValidationFailure { status, message }
}

fn classify_unreadable(status: u16, body: &str) -> ExternalResult {
    let lowered = body.to_lowercase();
    let tunnel = TUNNEL_MARKERS.iter().any(|marker| lowered.contains(marker));

    let (reason, message) = if tunnel {
        (
            UnreadableReason::TunnelBlocked,
            format!(
                "Downstream request was blocked by the tunnel proxy (HTTP {}): its HTML warning page was returned instead of JSON",
                status
            ),
        )
    } else if lowered.contains("html") {
        (
            UnreadableReason::UnknownFormat,
            format!(
                "Downstream returned an HTML page instead of JSON (HTTP {})",
                status
            ),
        )
    } else {
        (
            UnreadableReason::UnknownFormat,
            format!(
                "Downstream returned a response in an unknown format (HTTP {})",
                status
            ),
        )
    };

    ExternalResult::UnreadableResponse {
        status: Some(status),
        reason,
        message,
        raw_snippet: body_snippet(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    const NGROK_PAGE: &str = r#"<!DOCTYPE html><html><head><title>ngrok</title></head>
<body><div>You are about to visit abc.ngrok-free.app. ERR_NGROK_6024</div></body></html>"#;

    #[test]
    fn test_tunnel_page_is_tunnel_blocked() {
        match classify_response(200, NGROK_PAGE) {
            ExternalResult::UnreadableResponse {
                status,
                reason,
                message,
                raw_snippet,
            } => {
                assert_eq!(status, Some(200));
                assert_eq!(reason, UnreadableReason::TunnelBlocked);
                assert!(message.contains("tunnel proxy"));
                assert!(!message.to_lowercase().contains("parse"));
                assert!(raw_snippet.starts_with("<!DOCTYPE html>"));
            }
            other => panic!("Expected UnreadableResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_html_is_unknown_format() {
        match classify_response(500, "<html><body>Internal Server Error</body></html>") {
            ExternalResult::UnreadableResponse {
                reason, message, ..
            } => {
                assert_eq!(reason, UnreadableReason::UnknownFormat);
                assert!(message.contains("HTML page"));
            }
            other => panic!("Expected UnreadableResponse, got {:?}", other),
        }

        match classify_response(502, "upstream connect error") {
            ExternalResult::UnreadableResponse { reason, message, .. } => {
                assert_eq!(reason, UnreadableReason::UnknownFormat);
                assert!(message.contains("unknown format"));
            }
            other => panic!("Expected UnreadableResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_success_echoes_data() {
        let result = classify_response(
            201,
            r#"{"success":true,"message":"Pengajuan tersimpan","data":{"id":42}}"#,
        );
        assert_eq!(
            result,
            ExternalResult::Success {
                message: "Pengajuan tersimpan".to_string(),
                data: json!({"id": 42}),
            }
        );
    }

    #[test]
    fn test_success_without_data_uses_whole_body() {
        let result = classify_response(200, r#"{"success":true,"message":"ok"}"#);
        assert_eq!(
            result,
            ExternalResult::Success {
                message: "ok".to_string(),
                data: json!({"success": true, "message": "ok"}),
            }
        );
    }

    #[test]
    fn test_rejection_keeps_message_verbatim() {
        let result = classify_response(422, r#"{"success":false,"message":"Kode barang wajib diisi"}"#);
        assert_eq!(
            result,
            ExternalResult::ValidationFailure {
                status: 422,
                message: "Kode barang wajib diisi".to_string(),
            }
        );
    }

    #[test]
    fn test_disagreement_is_reported() {
        match classify_response(200, r#"{"success":false,"message":"Duplikat"}"#) {
            ExternalResult::ValidationFailure { status, message } => {
                assert_eq!(status, 200);
                assert!(message.starts_with("Duplikat"));
                assert!(message.contains("success=false"));
            }
            other => panic!("Expected ValidationFailure, got {:?}", other),
        }

        match classify_response(500, r#"{"success":true,"message":"ok"}"#) {
            ExternalResult::ValidationFailure { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("HTTP status was 500"));
            }
            other => panic!("Expected ValidationFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_error_field_used_when_no_message() {
        let result = classify_response(401, r#"{"error":"Token tidak valid"}"#);
        assert_eq!(result.message(), "Token tidak valid");
        assert!(result.is_authorization_failure());
    }

    #[tokio::test]
    async fn test_submit_sends_fields_and_file_paths() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pengajuan")
            .match_header("authorization", "Bearer tkn")
            .match_header("accept", "application/json")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="id_hal"\r\n\r\n3\r\n"#.to_string()),
                Matcher::Regex(r#"name="file_paths"\r\n\r\n\[\]\r\n"#.to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"success":true,"message":"ok"}"#)
            .create_async()
            .await;

        let payload = AggregatedPayload {
            fields: vec![("id_hal".to_string(), "3".to_string())],
            file_paths: "[]".to_string(),
            ttd_url: None,
            warnings: vec![],
        };
        let client = DownstreamClient::new(Duration::from_secs(5)).unwrap();
        let result = client
            .submit(&format!("{}/pengajuan", server.url()), &payload, "tkn")
            .await;

        mock.assert_async().await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_list_sends_accept_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pengajuan")
            .match_header("accept", "application/json")
            .match_header("authorization", "Bearer tkn")
            .with_status(200)
            .with_body(r#"{"success":true,"data":[{"id":1},{"id":2}]}"#)
            .create_async()
            .await;

        let client = DownstreamClient::new(Duration::from_secs(5)).unwrap();
        let result = client.list(&format!("{}/pengajuan", server.url()), "tkn").await;

        mock.assert_async().await;
        match result {
            ExternalResult::Success { data, .. } => assert_eq!(data, json!([{"id":1},{"id":2}])),
            other => panic!("Expected Success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_downstream_is_transport_failure() {
        let client = DownstreamClient::new(Duration::from_secs(2)).unwrap();
        match client.list("http://127.0.0.1:9/pengajuan", "tkn").await {
            ExternalResult::UnreadableResponse { status, reason, .. } => {
                assert_eq!(status, None);
                assert_eq!(reason, UnreadableReason::Transport);
            }
            other => panic!("Expected UnreadableResponse, got {:?}", other),
        }
    }
}
