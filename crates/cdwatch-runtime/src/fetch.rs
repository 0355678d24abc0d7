//! HTTP fetching for the URL watcher.
//!
//! Redirects are not followed: the status document and artifact endpoints
//! are read exactly as published. A non-success status (including a
//! redirect) is not an error — it is "nothing fetched", so a flaky endpoint
//! never corrupts stored watcher state.

use async_trait::async_trait;
use cdwatch_core::WatchError;
use tracing::info;

/// Byte-level fetch abstraction.
///
/// Exists so watcher tests can run against an in-memory fake instead of a
/// live server.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a URL.
    ///
    /// `Ok(None)` means the server answered with a non-success status;
    /// transport failures are errors.
    async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, WatchError>;
}

/// [`Fetcher`] backed by a reqwest client with redirects disabled.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build the client.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, WatchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WatchError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            info!(url, %status, "non-success response, nothing fetched");
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(|e| WatchError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(bytes.to_vec()))
    }
}
