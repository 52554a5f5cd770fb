//! Environment Canada HTTP client.

use std::time::Duration;

use crate::cache::WeatherSource;
use crate::domain::{LocationCode, WeatherReading};

use super::error::FetchError;
use super::parse::parse_feed;

/// Default upstream host.
pub const DEFAULT_BASE_URL: &str = "https://weather.gc.ca";

/// Configuration for the Environment Canada client.
#[derive(Debug, Clone)]
pub struct EnvCanadaConfig {
    /// Scheme and host of the feed server
    pub base_url: String,
    /// Request timeout; `None` keeps the transport default
    pub timeout_secs: Option<u64>,
}

impl EnvCanadaConfig {
    /// Create a config pointing at the production feed server.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

impl Default for EnvCanadaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for Environment Canada city feeds.
#[derive(Debug, Clone)]
pub struct EnvCanadaClient {
    http: reqwest::Client,
    base_url: String,
}

impl EnvCanadaClient {
    /// Create a new client with the given configuration.
    pub fn new(config: EnvCanadaConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the English city feed for `code`.
    pub fn feed_url(&self, code: &LocationCode) -> String {
        format!("{}/rss/city/{}_e.xml", self.base_url, code.as_str())
    }

    /// Fetch the raw feed XML.
    pub async fn fetch_feed(&self, code: &LocationCode) -> Result<String, FetchError> {
        let response = self.http.get(self.feed_url(code)).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response.text().await?)
    }

    /// Fetch and parse current conditions for `code`.
    pub async fn get_current_conditions(
        &self,
        code: &LocationCode,
    ) -> Result<WeatherReading, FetchError> {
        let xml = self.fetch_feed(code).await?;
        Ok(parse_feed(&xml)?)
    }
}

impl WeatherSource for EnvCanadaClient {
    async fn fetch(&self, code: &LocationCode) -> Result<WeatherReading, FetchError> {
        self.get_current_conditions(code).await
    }
}
