//! HTTP client for the commerce backend.
//!
//! Every call is guarded by a timeout; when it fires the in-flight request is
//! dropped, which aborts it.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::UpstreamError;

/// Envelope the backend wraps list and detail payloads in
#[derive(Debug, Deserialize)]
pub struct UpstreamEnvelope<T> {
    #[serde(default)]
    pub status: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request`, giving up after `timeout`. Does not retry and does not
    /// inspect the status.
    pub async fn fetch_with_timeout(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<Response, UpstreamError> {
        match tokio::time::timeout(timeout, request.send()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Upstream call timed out");
                Err(UpstreamError::Timeout(timeout))
            }
        }
    }

    /// GET `path` and unwrap the `{status: true, data}` envelope.
    #[instrument(skip(self))]
    pub async fn get_envelope<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
        let url = self.url(path);
        debug!(url = %url, "Fetching from upstream");

        let response = self
            .fetch_with_timeout(self.client.get(&url), self.timeout)
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let envelope: UpstreamEnvelope<T> = response.json().await?;
        if !envelope.status {
            return Err(UpstreamError::MalformedEnvelope(
                envelope
                    .message
                    .unwrap_or_else(|| "status is not true".to_string()),
            ));
        }

        envelope
            .data
            .ok_or_else(|| UpstreamError::MalformedEnvelope("missing data".to_string()))
    }

    /// GET `path` and return its JSON body, requiring a 2xx status.
    #[instrument(skip(self, bearer))]
    pub async fn get_json(&self, path: &str, bearer: Option<&str>) -> Result<Value, UpstreamError> {
        let (status, body) = self.send(Method::GET, path, bearer, None).await?;
        if !(200..300).contains(&status) {
            return Err(UpstreamError::Status(status));
        }
        Ok(body)
    }

    /// Passthrough call: any upstream status is returned alongside its JSON body.
    #[instrument(skip(self, bearer, body))]
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> Result<(u16, Value), UpstreamError> {
        let url = self.url(path);
        debug!(url = %url, method = %method, "Forwarding to upstream");

        let mut request = self
            .client
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.fetch_with_timeout(request, self.timeout).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok((status, Value::Null));
        }

        match serde_json::from_slice(&bytes) {
            Ok(body) => Ok((status, body)),
            // error pages are often HTML; keep the status, drop the body
            Err(_) if !(200..300).contains(&status) => Ok((status, Value::Null)),
            Err(e) => Err(UpstreamError::MalformedEnvelope(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = UpstreamClient::new("http://shop.local/api/", Duration::from_secs(10)).unwrap();
        assert_eq!(client.base_url(), "http://shop.local/api");
        assert_eq!(client.url("/products"), "http://shop.local/api/products");
    }

    #[test]
    fn test_envelope_defaults() {
        let envelope: UpstreamEnvelope<Vec<u8>> = serde_json::from_str("{}").unwrap();
        assert!(!envelope.status);
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        // port 9 (discard) on localhost is normally closed
        let client = UpstreamClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = client.get_envelope::<Vec<Value>>("/products").await;
        assert!(matches!(
            result,
            Err(UpstreamError::Transport(_)) | Err(UpstreamError::Timeout(_))
        ));
    }
}
