//! Mock Environment Canada client for running without network access.
//!
//! Loads city feeds from XML files and serves them as if they were live
//! responses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::WeatherSource;
use crate::domain::{CodeScheme, LocationCode, WeatherReading};

use super::error::FetchError;
use super::parse::parse_feed;

/// Suffix of feed files, matching the upstream naming.
const FEED_SUFFIX: &str = "_e.xml";

/// Mock client that serves feeds from disk.
#[derive(Clone)]
pub struct MockEnvCanadaClient {
    /// Raw feed XML, keyed by location code.
    feeds: Arc<RwLock<HashMap<String, String>>>,
}

impl MockEnvCanadaClient {
    /// Create a mock client by loading feed files from a directory.
    ///
    /// Expects files named `{code}_e.xml` (e.g. `on-143_e.xml`). Feeds are
    /// parsed on each fetch, so a malformed file behaves like a bad upstream
    /// response.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, FetchError> {
        let feeds = load_feeds(data_dir.as_ref())?;
        Ok(Self {
            feeds: Arc::new(RwLock::new(feeds)),
        })
    }

    /// Codes that have a feed file.
    pub async fn available_codes(&self) -> Vec<String> {
        let feeds = self.feeds.read().await;
        let mut codes: Vec<String> = feeds.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Codes that have a feed file, split into those `scheme` accepts and
    /// those it rejects. Rejected feeds can never be requested.
    pub async fn servable_codes(&self, scheme: CodeScheme) -> (Vec<String>, Vec<String>) {
        self.available_codes()
            .await
            .into_iter()
            .partition(|code| scheme.validate(code))
    }

    /// Reload feeds from disk.
    pub async fn reload(&self, data_dir: impl AsRef<Path>) -> Result<(), FetchError> {
        let new_feeds = load_feeds(data_dir.as_ref())?;
        let mut feeds = self.feeds.write().await;
        *feeds = new_feeds;
        Ok(())
    }
}

impl WeatherSource for MockEnvCanadaClient {
    async fn fetch(&self, code: &LocationCode) -> Result<WeatherReading, FetchError> {
        let feeds = self.feeds.read().await;
        let xml = feeds
            .get(code.as_str())
            .ok_or_else(|| FetchError::MockMissing {
                code: code.to_string(),
            })?;
        Ok(parse_feed(xml)?)
    }
}

fn load_feeds(data_dir: &Path) -> Result<HashMap<String, String>, FetchError> {
    let entries = std::fs::read_dir(data_dir).map_err(|e| FetchError::Mock {
        message: format!("failed to read mock data directory {data_dir:?}: {e}"),
    })?;

    let mut feeds = HashMap::new();
    for entry in entries {
        let entry = entry.map_err(|e| FetchError::Mock {
            message: format!("failed to read directory entry: {e}"),
        })?;

        let path = entry.path();
        let Some(code) = path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|name| name.strip_suffix(FEED_SUFFIX))
        else {
            continue;
        };
        if !path.is_file() {
            continue;
        }

        let xml = std::fs::read_to_string(&path).map_err(|e| FetchError::Mock {
            message: format!("failed to read {path:?}: {e}"),
        })?;
        feeds.insert(code.to_string(), xml);
    }

    if feeds.is_empty() {
        return Err(FetchError::Mock {
            message: format!("no *{FEED_SUFFIX} files found in {data_dir:?}"),
        });
    }

    Ok(feeds)
}
