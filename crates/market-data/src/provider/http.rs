//! HTTP plumbing shared by the adapters.

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::AdapterConfig;
use crate::errors::MarketDataError;

/// A response that was not rejected outright (anything but 429 or a
/// transport failure). Adapters inspect the status themselves because some
/// providers put their error envelope in a 4xx body.
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    /// Body of a 2xx response; any other status is a provider error.
    pub fn into_success_body(self, provider: &str) -> Result<String, MarketDataError> {
        if !self.status.is_success() {
            return Err(MarketDataError::provider(
                provider,
                format!("HTTP {}", self.status),
            ));
        }
        Ok(self.body)
    }
}

/// One adapter's HTTP client.
pub(crate) struct HttpClient {
    provider: &'static str,
    client: Client,
    api_key: Option<String>,
}

impl HttpClient {
    pub fn new(provider: &'static str, config: &AdapterConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            provider,
            client,
            api_key: config.api_key.clone(),
        }
    }

    pub fn url(&self, base: &str, params: &[(&str, &str)]) -> Result<Url, MarketDataError> {
        Url::parse_with_params(base, params).map_err(|e| {
            MarketDataError::provider(self.provider, format!("Failed to build URL: {}", e))
        })
    }

    fn masked(&self, url: &Url) -> String {
        match &self.api_key {
            Some(key) => url.as_str().replace(key.as_str(), "***"),
            None => url.to_string(),
        }
    }

    /// Timeouts become `Timeout`; other transport failures are `Network`,
    /// with the URL stripped so keys never reach error messages.
    fn transport_error(&self, e: reqwest::Error) -> MarketDataError {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: self.provider.to_string(),
            }
        } else {
            MarketDataError::from(e.without_url())
        }
    }

    /// GET `url`. HTTP 429 is mapped to `RateLimited`, timeouts to
    /// `Timeout`, everything else comes back to the adapter.
    pub async fn get(&self, url: Url) -> Result<HttpResponse, MarketDataError> {
        debug!("{} request: {}", self.provider, self.masked(&url));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::rate_limited(self.provider));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(HttpResponse { status, body })
    }
}

/// Decodes a JSON payload, mapping failures to `Parse`.
pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: &str,
    body: &str,
) -> Result<T, MarketDataError> {
    serde_json::from_str(body).map_err(|e| MarketDataError::parse(provider, e))
}

/// Parses a provider number that arrives as text, e.g. `"1,234.5"`.
/// Sentinels and blanks give `None`.
pub(crate) fn parse_number(raw: &str, sentinels: &[&str]) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || sentinels.contains(&trimmed) {
        return None;
    }
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
