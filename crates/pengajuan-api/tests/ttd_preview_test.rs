//! Signature preview integration tests.
//!
//! Run with: `cargo test -p pengajuan-api --test ttd_preview_test`

mod common;

use axum_test::multipart::{MultipartForm, Part};
use bytes::Bytes;
use common::{bearer, signature_png, test_config, test_server, Upstreams};
use serde_json::Value;

const PREVIEW_PATH: &str = "/api/v0/ttd/preview";

#[tokio::test]
async fn test_preview_keys_white_background() {
    let server = test_server(&test_config(Upstreams::default()));

    let form = MultipartForm::new().add_part(
        "ttd",
        Part::bytes(Bytes::from(signature_png()))
            .file_name("ttd.png")
            .mime_type("image/png"),
    );

    let response = server
        .post(PREVIEW_PATH)
        .add_header("Authorization", bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(response.header("x-ttd-transparent"), "true");

    let keyed = image::load_from_memory(&response.as_bytes()[..])
        .unwrap()
        .to_rgba8();
    assert_eq!(keyed.dimensions(), (4, 2));
    assert_eq!(keyed.get_pixel(0, 0)[3], 0);
    assert_eq!(keyed.get_pixel(3, 1).0, [120, 120, 120, 255]);
}

#[tokio::test]
async fn test_preview_passes_undecodable_upload_through() {
    let server = test_server(&test_config(Upstreams::default()));

    let form = MultipartForm::new().add_part(
        "ttd",
        Part::bytes(Bytes::from_static(b"definitely not an image")).file_name("ttd.png"),
    );

    let response = server
        .post(PREVIEW_PATH)
        .add_header("Authorization", bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("x-ttd-transparent"), "false");
    assert_eq!(&response.as_bytes()[..], b"definitely not an image");
}

#[tokio::test]
async fn test_preview_fetches_remote_source_with_bearer() {
    let mut source = mockito::Server::new_async().await;
    let fetch = source
        .mock("GET", "/ttd/8706123.png")
        .match_header("authorization", "Bearer test-bearer-token")
        .with_status(200)
        .with_body(signature_png())
        .expect(1)
        .create_async()
        .await;

    let server = test_server(&test_config(Upstreams {
        ttd_sources: vec![source.url()],
        ..Upstreams::default()
    }));
    let form = MultipartForm::new().add_text(
        "ttd_source_url",
        format!("{}/ttd/8706123.png", source.url()),
    );

    let response = server
        .post(PREVIEW_PATH)
        .add_header("Authorization", bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("x-ttd-transparent"), "true");
    fetch.assert_async().await;
}

#[tokio::test]
async fn test_preview_without_signature_is_bad_request() {
    let server = test_server(&test_config(Upstreams::default()));

    let response = server
        .post(PREVIEW_PATH)
        .add_header("Authorization", bearer())
        .multipart(MultipartForm::new().add_text("catatan", "tanpa ttd"))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_preview_remote_failure_is_bad_gateway() {
    let mut source = mockito::Server::new_async().await;
    source
        .mock("GET", "/ttd/missing.png")
        .with_status(404)
        .create_async()
        .await;

    let server = test_server(&test_config(Upstreams {
        ttd_sources: vec![source.url()],
        ..Upstreams::default()
    }));
    let form = MultipartForm::new().add_text(
        "ttd_source_url",
        format!("{}/ttd/missing.png", source.url()),
    );

    let response = server
        .post(PREVIEW_PATH)
        .add_header("Authorization", bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 502);
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        "signature preview failed: Signature source returned HTTP 404"
    );
}

#[tokio::test]
async fn test_preview_refuses_unlisted_source_without_fetching() {
    let mut internal = mockito::Server::new_async().await;
    let leak = internal
        .mock("GET", "/env")
        .match_header("authorization", "Bearer test-bearer-token")
        .with_status(200)
        .with_body("DB_PASSWORD=hunter2")
        .expect(0)
        .create_async()
        .await;

    let server = test_server(&test_config(Upstreams::default()));
    let form = MultipartForm::new().add_text("ttd_source_url", format!("{}/env", internal.url()));

    let response = server
        .post(PREVIEW_PATH)
        .add_header("Authorization", bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(!response.text().contains("hunter2"));
    leak.assert_async().await;
}

#[tokio::test]
async fn test_preview_gateway_origin_is_allowed_by_default() {
    let mut gateway = mockito::Server::new_async().await;
    let fetch = gateway
        .mock("GET", "/files/ttd/8706123.png")
        .with_status(200)
        .with_body(signature_png())
        .expect(1)
        .create_async()
        .await;

    let server = test_server(&test_config(Upstreams {
        gateway: Some(format!("{}/upload", gateway.url())),
        ..Upstreams::default()
    }));
    let form = MultipartForm::new().add_text(
        "ttd_source_url",
        format!("{}/files/ttd/8706123.png", gateway.url()),
    );

    let response = server
        .post(PREVIEW_PATH)
        .add_header("Authorization", bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("x-ttd-transparent"), "true");
    fetch.assert_async().await;
}

#[tokio::test]
async fn test_preview_does_not_echo_non_image_remote_body() {
    let mut source = mockito::Server::new_async().await;
    source
        .mock("GET", "/ttd/config.png")
        .with_status(200)
        .with_body("DB_PASSWORD=hunter2")
        .create_async()
        .await;

    let server = test_server(&test_config(Upstreams {
        ttd_sources: vec![source.url()],
        ..Upstreams::default()
    }));
    let form = MultipartForm::new().add_text(
        "ttd_source_url",
        format!("{}/ttd/config.png", source.url()),
    );

    let response = server
        .post(PREVIEW_PATH)
        .add_header("Authorization", bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 502);
    assert!(!response.text().contains("hunter2"));
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        "signature preview failed: Signature source did not return a decodable image"
    );
}
