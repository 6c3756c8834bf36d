use pengajuan_core::models::SignatureAsset;
use pengajuan_processing::{make_transparent, ProcessedImage, TransparencyThresholds};
use thiserror::Error;

use crate::remote_image::{FetchError, RemoteImageFetcher};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature image is empty")]
    Empty,

    #[error(transparent)]
    Source(#[from] FetchError),

    #[error("Signature source did not return a decodable image")]
    Undecodable,

    #[error("Signature processing task failed: {0}")]
    Processing(String),
}

impl SignatureError {
    /// The caller sent a source URL the relay refuses to fetch.
    pub fn is_rejected_source(&self) -> bool {
        matches!(self, SignatureError::Source(e) if e.is_rejected())
    }
}

/// Turns a `SignatureAsset` into a materialized, chroma-keyed image buffer.
#[derive(Clone, Debug)]
pub struct SignatureProcessor {
    fetcher: RemoteImageFetcher,
    thresholds: TransparencyThresholds,
}

impl SignatureProcessor {
    pub fn new(fetcher: RemoteImageFetcher, thresholds: TransparencyThresholds) -> Self {
        Self {
            fetcher,
            thresholds,
        }
    }

    /// Refuses a remote asset whose URL is off the allow-list. Inline assets
    /// always pass.
    pub fn check_source(&self, asset: &SignatureAsset) -> Result<(), SignatureError> {
        if let SignatureAsset::Remote(url) = asset {
            self.fetcher.check_source(url)?;
        }
        Ok(())
    }

    /// Fetches remote assets with the caller's token, then keys the image on
    /// the blocking pool. An inline image that does not decode passes through
    /// unchanged; a remote one is an error.
    pub async fn prepare(
        &self,
        asset: SignatureAsset,
        token: &str,
    ) -> Result<ProcessedImage, SignatureError> {
        let (raw, remote) = match asset {
            SignatureAsset::Inline(data) => (data, false),
            SignatureAsset::Remote(url) => (self.fetcher.fetch(&url, token).await?, true),
        };
        if raw.is_empty() {
            return Err(SignatureError::Empty);
        }

        let thresholds = self.thresholds;
        let processed = tokio::task::spawn_blocking(move || make_transparent(&raw, thresholds))
            .await
            .map_err(|e| SignatureError::Processing(e.to_string()))?;

        if remote && !processed.transparent {
            return Err(SignatureError::Undecodable);
        }
        Ok(processed)
    }
}

/// File extension matching the processed buffer.
pub fn extension_for(processed: &ProcessedImage) -> &'static str {
    if processed.transparent {
        return "png";
    }
    match processed.content_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/png" => "png",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote_image::SourceAllowList;
    use std::time::Duration;

    fn processor(origins: &[&str]) -> SignatureProcessor {
        SignatureProcessor::new(
            RemoteImageFetcher::new(
                Duration::from_secs(2),
                SourceAllowList::new(origins.iter().copied()).unwrap(),
            )
            .unwrap(),
            TransparencyThresholds::default(),
        )
    }

    fn dark_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 10, 10, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        png.into_inner()
    }

    #[tokio::test]
    async fn test_remote_asset_is_fetched_and_keyed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ttd.png")
            .match_header("authorization", "Bearer tkn")
            .with_status(200)
            .with_body(dark_png())
            .create_async()
            .await;

        let processed = processor(&[server.url().as_str()])
            .prepare(
                SignatureAsset::Remote(format!("{}/ttd.png", server.url())),
                "tkn",
            )
            .await
            .unwrap();

        assert!(processed.transparent);
        assert_eq!(extension_for(&processed), "png");
        let keyed = image::load_from_memory(&processed.data).unwrap().to_rgba8();
        assert!(keyed.pixels().all(|p| p[3] == 0));
    }

    #[tokio::test]
    async fn test_empty_inline_asset_is_rejected() {
        let err = processor(&[])
            .prepare(SignatureAsset::Inline(Vec::new()), "tkn")
            .await
            .unwrap_err();
        assert_eq!(err, SignatureError::Empty);
        assert_eq!(err.to_string(), "Signature image is empty");
    }

    #[tokio::test]
    async fn test_undecodable_inline_asset_passes_through() {
        let processed = processor(&[])
            .prepare(SignatureAsset::Inline(b"scribble".to_vec()), "tkn")
            .await
            .unwrap();
        assert!(!processed.transparent);
        assert_eq!(processed.data, b"scribble");
        assert_eq!(extension_for(&processed), "bin");
    }

    #[tokio::test]
    async fn test_undecodable_remote_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ttd.png")
            .with_status(200)
            .with_body("DB_PASSWORD=hunter2")
            .create_async()
            .await;

        let err = processor(&[server.url().as_str()])
            .prepare(
                SignatureAsset::Remote(format!("{}/ttd.png", server.url())),
                "tkn",
            )
            .await
            .unwrap_err();
        assert_eq!(err, SignatureError::Undecodable);
        assert!(!err.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_remote_status_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ttd.png")
            .with_status(403)
            .create_async()
            .await;

        let err = processor(&[server.url().as_str()])
            .prepare(
                SignatureAsset::Remote(format!("{}/ttd.png", server.url())),
                "tkn",
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(!err.is_rejected_source());
    }

    #[test]
    fn test_check_source_refuses_unlisted_origin() {
        let signatures = processor(&["https://cdn.example.com"]);
        assert!(signatures
            .check_source(&SignatureAsset::Inline(vec![1]))
            .is_ok());
        assert!(signatures
            .check_source(&SignatureAsset::Remote(
                "https://cdn.example.com/ttd/1.png".to_string()
            ))
            .is_ok());

        let err = signatures
            .check_source(&SignatureAsset::Remote(
                "http://169.254.169.254/latest/meta-data".to_string(),
            ))
            .unwrap_err();
        assert!(err.is_rejected_source());
        assert_eq!(
            err.to_string(),
            "Signature source origin http://169.254.169.254 is not allowed"
        );
    }
}
