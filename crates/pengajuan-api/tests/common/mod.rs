//! Test helpers: build the router against mock upstreams.
//!
//! Run from workspace root: `cargo test -p pengajuan-api`.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use pengajuan_api::setup;
use pengajuan_core::{Config, RelayConfig};
use std::io::Cursor;

pub const TOKEN: &str = "test-bearer-token";

/// Base URLs of the mock upstreams; `None` leaves the variable unset.
#[derive(Default)]
pub struct Upstreams {
    pub gateway: Option<String>,
    pub submission: Option<String>,
    pub list: Option<String>,
    /// Extra origins `ttd_source_url` may point at
    pub ttd_sources: Vec<String>,
}

pub fn test_config(upstreams: Upstreams) -> Config {
    let mut relay = RelayConfig::default();
    relay.storage_gateway_url = upstreams.gateway;
    relay.submission_api_url = upstreams.submission;
    relay.list_api_url = upstreams.list;
    relay.ttd_source_allowed_origins = upstreams.ttd_sources;
    relay.gateway_timeout_secs = 5;
    relay.downstream_timeout_secs = 5;
    relay.list_retry_base_ms = 1;
    Config(Box::new(relay))
}

pub fn test_server(config: &Config) -> TestServer {
    let (_state, router) = setup::build_app(config).expect("Failed to build app");
    TestServer::new(router).expect("Failed to start test server")
}

pub fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}

/// Every required field, filled the way the portal form sends them.
pub fn complete_form() -> MultipartForm {
    MultipartForm::new()
        .add_text("hal_id", "3")
        .add_text("kepada", "Ka.Sub Bid PTI")
        .add_text("satker_id", "12")
        .add_text("kode_barang", "BRG-001")
        .add_text("deskripsi", "AC ruang server bocor")
        .add_text("nama_pelapor", "Budi Santoso")
        .add_text("npp_pelapor", "8706123")
        .add_text("nama_atasan", "Sari Dewi")
        .add_text("npp_atasan", "8501001")
}

pub fn file_part(data: &'static [u8], file_name: &str, mime: &str) -> Part {
    Part::bytes(Bytes::from_static(data))
        .file_name(file_name.to_string())
        .mime_type(mime.to_string())
}

/// A PNG whose left half is white and right half mid-gray.
pub fn signature_png() -> Vec<u8> {
    let img = RgbaImage::from_fn(4, 2, |x, _| {
        if x < 2 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([120, 120, 120, 255])
        }
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    out.into_inner()
}

pub fn gateway_success(url: &str) -> String {
    serde_json::json!({ "success": true, "data": { "fileUrl": url } }).to_string()
}
