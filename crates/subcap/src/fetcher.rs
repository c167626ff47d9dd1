// Text Fetcher: downloads playlists and subtitle segments as UTF-8 text.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, trace};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{CaptureError, Result};

/// Source of playlist and segment text. `HttpTransport` is the real one;
/// tests script their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url` and returns its body as text. `operation` names the
    /// request in errors, e.g. "playlist fetch".
    async fn fetch_text(&self, url: &Url, operation: &'static str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self::with_client(config.build_client()?))
    }

    /// Uses an existing client, sharing its connection pool.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_text(&self, url: &Url, operation: &'static str) -> Result<String> {
        trace!(%url, operation, "Sending request");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::http_status(status, url.as_str(), operation));
        }
        let body = response.bytes().await?;
        debug!(%url, operation, bytes = body.len(), "Fetched");
        Ok(decode_text(&body))
    }
}

/// Decodes a response body as UTF-8, replacing invalid sequences and
/// dropping a leading byte order mark.
pub fn decode_text(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_owned(),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_order_mark_is_stripped() {
        assert_eq!(decode_text(b"\xef\xbb\xbfWEBVTT\n"), "WEBVTT\n");
        assert_eq!(decode_text(b"WEBVTT\n"), "WEBVTT\n");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(decode_text(b"caf\xe9"), "caf\u{fffd}");
    }

    #[test]
    fn transport_builds_from_default_config() {
        assert!(HttpTransport::new(&HttpConfig::default()).is_ok());
    }
}
