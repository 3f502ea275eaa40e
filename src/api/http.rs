//! HTTP client shared by every plugin call.
//!
//! Plugins run synchronously on the blocking pool, so the client keeps a
//! handle to the Tokio runtime it was created on and drives the async
//! `reqwest` futures with [`Handle::block_on`].

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, instrument};
use url::Url;

use super::ApiError;

/// Response handed back to a plugin.
///
/// Non-2xx statuses are not errors here; the plugin decides what they mean.
#[derive(Debug, Clone, Serialize)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub text: String,
}

/// Thin wrapper around a pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    handle: Handle,
}

impl HttpClient {
    /// Create a client bound to the current Tokio runtime.
    pub fn new() -> Result<Self, ApiError> {
        let handle = Handle::try_current().map_err(|_| ApiError::NoRuntime)?;

        let client = Client::builder()
            .user_agent(concat!("mat/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client, handle })
    }

    /// Fetch a URL and return status, final URL and body text.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<HttpResponse, ApiError> {
        let parsed = parse_url(url)?;
        let response = self.client.get(parsed).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        debug!(status, "Response received");

        let text = response.text().await?;
        Ok(HttpResponse {
            status,
            url: final_url,
            text,
        })
    }

    /// Fetch a URL and return the raw body.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let parsed = parse_url(url)?;
        let response = self.client.get(parsed).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response.bytes().await?.to_vec())
    }

    /// Blocking form of [`fetch`](Self::fetch), for plugin code.
    ///
    /// Must be called from a thread that is allowed to block (the blocking
    /// pool), never from inside an async task.
    pub fn get(&self, url: &str) -> Result<HttpResponse, ApiError> {
        self.handle.block_on(self.fetch(url))
    }

    /// Blocking form of [`fetch_bytes`](Self::fetch_bytes).
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.handle.block_on(self.fetch_bytes(url))
    }
}

fn parse_url(url: &str) -> Result<Url, ApiError> {
    Url::parse(url).map_err(|source| ApiError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}
