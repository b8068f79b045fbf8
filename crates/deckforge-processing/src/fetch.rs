//! HTTP downloads of source files

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use bytes::{Bytes, BytesMut};
use deckforge_core::Config;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;

use crate::url_guard::validate_source_url;

const USER_AGENT: &str = concat!("deckforge/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

/// A downloaded body and the content type the server reported.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Fetched {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }
}

/// Shared HTTP client with a download cap and the source URL guard.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    max_bytes: usize,
    allow_private_urls: bool,
}

impl Downloader {
    pub fn new(timeout: Duration, max_bytes: usize, allow_private_urls: bool) -> Result<Self> {
        // Redirects are followed by `fetch` so every hop goes through the URL guard
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            max_bytes,
            allow_private_urls,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.http_timeout_secs),
            config.max_download_bytes(),
            config.allow_private_urls,
        )
    }

    /// Check a URL against the private-address guard without fetching it.
    pub async fn check_url(&self, url: &str) -> Result<()> {
        validate_source_url(url, self.allow_private_urls)
            .await
            .map_err(|e| anyhow!(e))
    }

    /// GET `url` and return its body, failing on non-success status or oversize bodies.
    ///
    /// Up to `MAX_REDIRECTS` redirects are followed; each target is checked
    /// against the URL guard before it is requested.
    pub async fn fetch(&self, url: &str) -> Result<Fetched> {
        self.check_url(url).await?;
        self.follow(url).await
    }

    /// Request an already checked URL, guarding every redirect hop.
    async fn follow(&self, url: &str) -> Result<Fetched> {
        let mut current = url.to_string();
        for hop in 0..=MAX_REDIRECTS {
            if hop > 0 {
                self.check_url(&current)
                    .await
                    .with_context(|| format!("Redirect to {} rejected", current))?;
            }
            let response = self
                .client
                .get(&current)
                .send()
                .await
                .with_context(|| format!("Request to {} failed", current))?;

            match redirect_target(&response)? {
                Some(next) => {
                    tracing::debug!(from = %current, to = %next, "Following redirect");
                    current = next;
                }
                None => return self.read_body(&current, response).await,
            }
        }
        Err(anyhow!("Too many redirects fetching {}", url))
    }

    async fn read_body(&self, url: &str, mut response: reqwest::Response) -> Result<Fetched> {
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Download failed with status {}", status));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes as u64 {
                return Err(anyhow!(
                    "File is {} bytes, larger than the {} byte limit",
                    len,
                    self.max_bytes
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read response body")?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(anyhow!(
                    "File is larger than the {} byte limit",
                    self.max_bytes
                ));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %url, size = body.len(), "Source downloaded");

        Ok(Fetched {
            bytes: body.freeze(),
            content_type,
        })
    }
}

/// The absolute `Location` of a redirect response, or `None` for any other status.
fn redirect_target(response: &reqwest::Response) -> Result<Option<String>> {
    if !response.status().is_redirection() {
        return Ok(None);
    }
    let Some(location) = response.headers().get(LOCATION) else {
        return Ok(None);
    };
    let location = location
        .to_str()
        .context("Redirect location is not valid text")?;
    let next = response
        .url()
        .join(location)
        .with_context(|| format!("Invalid redirect location: {}", location))?;
    Ok(Some(next.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader(max_bytes: usize) -> Downloader {
        Downloader::new(Duration::from_secs(5), max_bytes, true).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_content_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/notes.txt")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("hello")
            .create_async()
            .await;

        let fetched = downloader(1024)
            .fetch(&format!("{}/notes.txt", server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(&fetched.bytes[..], b"hello");
        assert_eq!(fetched.content_type.as_deref(), Some("text/plain"));
        assert!(!fetched.is_html());
    }

    #[tokio::test]
    async fn test_fetch_fails_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.pdf")
            .with_status(404)
            .create_async()
            .await;

        let err = downloader(1024)
            .fetch(&format!("{}/missing.pdf", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_enforces_size_cap() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big.txt")
            .with_status(200)
            .with_body("x".repeat(64))
            .create_async()
            .await;

        let result = downloader(16)
            .fetch(&format!("{}/big.txt", server.url()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_applies_url_guard() {
        let guarded = Downloader::new(Duration::from_secs(5), 1024, false).unwrap();
        assert!(guarded.fetch("http://127.0.0.1:9/a.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/old.txt")
            .with_status(302)
            .with_header("location", "/new.txt")
            .create_async()
            .await;
        server
            .mock("GET", "/new.txt")
            .with_status(200)
            .with_body("moved")
            .create_async()
            .await;

        let fetched = downloader(1024)
            .fetch(&format!("{}/old.txt", server.url()))
            .await
            .unwrap();
        assert_eq!(&fetched.bytes[..], b"moved");
    }

    #[tokio::test]
    async fn test_redirect_to_private_address_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let metadata = server
            .mock("GET", "/latest/meta-data")
            .with_status(200)
            .with_body("SECRET")
            .expect(0)
            .create_async()
            .await;
        let redirect = server
            .mock("GET", "/report.pdf")
            .with_status(302)
            .with_header(
                "location",
                &format!("http://127.0.0.1:{}/latest/meta-data", server.socket_address().port()),
            )
            .create_async()
            .await;

        // The first hop is trusted here the way a public host would pass the guard
        let guarded = Downloader::new(Duration::from_secs(5), 1024, false).unwrap();
        let err = guarded
            .follow(&format!("{}/report.pdf", server.url()))
            .await
            .unwrap_err();

        redirect.assert_async().await;
        assert!(format!("{:#}", err).contains("Private/internal IP"));
        metadata.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_loop_is_cut_off() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect_at_least(1)
            .create_async()
            .await;

        let err = downloader(1024)
            .fetch(&format!("{}/loop", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Too many redirects"));
    }
}
