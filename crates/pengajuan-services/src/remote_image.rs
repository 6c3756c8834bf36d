//! Fetches signature images that the browser referenced by URL instead of
//! uploading inline.
//!
//! Only origins on the allow-list are contacted, and redirects are not
//! followed, so a caller cannot point the relay (and their bearer token) at
//! an arbitrary host.

use anyhow::{Context, Result};
use reqwest::{redirect, Client, Url};
use std::time::Duration;
use thiserror::Error;

use crate::http::{describe_transport_error, TUNNEL_SKIP_HEADER};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid signature source URL: {0}")]
    InvalidUrl(String),

    #[error("Signature source origin {0} is not allowed")]
    NotAllowed(String),

    #[error("{0}")]
    Transport(String),

    #[error("Signature source returned HTTP {status}")]
    Status { status: u16 },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// The URL was refused before any request went out.
    pub fn is_rejected(&self) -> bool {
        matches!(self, FetchError::InvalidUrl(_) | FetchError::NotAllowed(_))
    }
}

/// Origins a remote signature may be fetched from.
///
/// Entries may be bare origins or full URLs; only `scheme://host[:port]` is
/// kept. An empty list refuses every remote source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceAllowList {
    origins: Vec<String>,
}

impl SourceAllowList {
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut origins = Vec::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            let url = Url::parse(entry)
                .with_context(|| format!("Invalid signature source origin '{}'", entry))?;
            if !is_http(&url) {
                anyhow::bail!("Signature source origin '{}' must be http or https", entry);
            }
            let origin = url.origin().ascii_serialization();
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }
        Ok(Self { origins })
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn allows(&self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        self.origins.iter().any(|allowed| *allowed == origin)
    }
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[derive(Clone, Debug)]
pub struct RemoteImageFetcher {
    client: Client,
    allowed: SourceAllowList,
}

impl RemoteImageFetcher {
    pub fn new(timeout: Duration, allowed: SourceAllowList) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client for signature source")?;
        Ok(Self { client, allowed })
    }

    /// Parses `url` and checks it against the allow-list without sending
    /// anything.
    pub fn check_source(&self, url: &str) -> Result<Url, FetchError> {
        let trimmed = url.trim();
        let parsed =
            Url::parse(trimmed).map_err(|_| FetchError::InvalidUrl(trimmed.to_string()))?;
        if !is_http(&parsed) {
            return Err(FetchError::InvalidUrl(trimmed.to_string()));
        }
        if !self.allowed.allows(&parsed) {
            tracing::warn!(origin = %parsed.origin().ascii_serialization(), "Refused signature source");
            return Err(FetchError::NotAllowed(parsed.origin().ascii_serialization()));
        }
        Ok(parsed)
    }

    /// GET `url` with the caller's bearer token and return the body bytes.
    pub async fn fetch(&self, url: &str, token: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.check_source(url)?;

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .header(TUNNEL_SKIP_HEADER, "true")
            .send()
            .await
            .map_err(|e| FetchError::Transport(describe_transport_error("Signature source", &e)))?;

        // Redirects are not followed, so a 3xx lands here too.
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            FetchError::Transport(format!("Failed to read signature source body: {}", e))
        })?;

        tracing::debug!(url = %url, bytes = bytes.len(), "Fetched remote signature image");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher_for(origins: &[&str]) -> RemoteImageFetcher {
        RemoteImageFetcher::new(
            Duration::from_secs(5),
            SourceAllowList::new(origins.iter().copied()).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_forwards_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ttd/42")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_body(vec![1u8, 2, 3])
            .create_async()
            .await;

        let fetcher = fetcher_for(&[server.url().as_str()]);
        let bytes = fetcher
            .fetch(&format!("{}/ttd/42", server.url()), "abc")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ttd/404")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = fetcher_for(&[server.url().as_str()]);
        let err = fetcher
            .fetch(&format!("{}/ttd/404", server.url()), "abc")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_url() {
        let fetcher = fetcher_for(&["https://cdn.example.com"]);
        let err = fetcher.fetch("file:///etc/passwd", "abc").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert!(err.is_rejected());
    }

    #[tokio::test]
    async fn test_unlisted_origin_is_never_contacted() {
        let mut internal = mockito::Server::new_async().await;
        let mock = internal
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let fetcher = fetcher_for(&["https://cdn.example.com"]);
        let err = fetcher
            .fetch(&format!("{}/secrets", internal.url()), "abc")
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::NotAllowed(internal.url()));
        assert!(err.is_rejected());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirects_are_not_followed() {
        let mut internal = mockito::Server::new_async().await;
        let hidden = internal
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut allowed = mockito::Server::new_async().await;
        allowed
            .mock("GET", "/ttd.png")
            .with_status(302)
            .with_header("location", &format!("{}/secrets", internal.url()))
            .create_async()
            .await;

        let fetcher = fetcher_for(&[allowed.url().as_str()]);
        let err = fetcher
            .fetch(&format!("{}/ttd.png", allowed.url()), "abc")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(302));
        hidden.assert_async().await;
    }

    #[test]
    fn test_allow_list_keeps_only_origins() {
        let list = SourceAllowList::new([
            "https://cdn.example.com/uploads/",
            "https://CDN.example.com:443",
            "http://10.0.0.5:8080",
        ])
        .unwrap();
        assert_eq!(list.len(), 2);

        let allowed = Url::parse("https://cdn.example.com/ttd/1.png").unwrap();
        let other_port = Url::parse("https://cdn.example.com:8443/ttd/1.png").unwrap();
        let userinfo = Url::parse("https://cdn.example.com@169.254.169.254/").unwrap();
        assert!(list.allows(&allowed));
        assert!(!list.allows(&other_port));
        assert!(!list.allows(&userinfo));
    }

    #[test]
    fn test_allow_list_rejects_bad_entries() {
        assert!(SourceAllowList::new(["not a url"]).is_err());
        assert!(SourceAllowList::new(["ftp://files.example.com"]).is_err());
        assert!(SourceAllowList::new(Vec::<String>::new()).unwrap().is_empty());
    }
}
