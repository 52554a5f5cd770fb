//! Process configuration.
//!
//! Read once at startup from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::domain::CodeScheme;
use crate::envcanada::DEFAULT_BASE_URL;

/// Listen address variable.
pub const ENV_ADDR: &str = "WEATHER_PROXY_ADDR";
/// Upstream host variable.
pub const ENV_UPSTREAM_BASE_URL: &str = "WEATHER_UPSTREAM_BASE_URL";
/// Upstream request timeout variable, in seconds.
pub const ENV_UPSTREAM_TIMEOUT_SECS: &str = "WEATHER_UPSTREAM_TIMEOUT_SECS";
/// Validation scheme variable.
pub const ENV_CODE_SCHEME: &str = "WEATHER_CODE_SCHEME";
/// Mock feed directory variable.
pub const ENV_MOCK_DIR: &str = "WEATHER_MOCK_DIR";

/// Errors from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Listen address did not parse
    #[error("WEATHER_PROXY_ADDR: invalid socket address {0:?}")]
    InvalidAddr(String),

    /// Timeout was not a positive integer
    #[error("WEATHER_UPSTREAM_TIMEOUT_SECS: expected a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),

    /// Scheme name not recognised
    #[error("WEATHER_CODE_SCHEME: {0}")]
    InvalidScheme(#[from] crate::domain::UnknownCodeScheme),
}

/// Configuration for the proxy process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,

    /// Scheme and host of the feed server.
    pub upstream_base_url: String,

    /// Upstream request timeout; `None` keeps the transport default.
    pub upstream_timeout_secs: Option<u64>,

    /// Which location code shape is accepted.
    pub code_scheme: CodeScheme,

    /// Serve feeds from this directory instead of the network.
    pub mock_dir: Option<PathBuf>,
}

impl ProxyConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset or empty variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = var(ENV_ADDR) {
            config.listen_addr = addr
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAddr(addr.clone()))?;
        }

        if let Some(url) = var(ENV_UPSTREAM_BASE_URL) {
            config.upstream_base_url = url.trim().to_string();
        }

        if let Some(secs) = var(ENV_UPSTREAM_TIMEOUT_SECS) {
            let parsed: u64 = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(secs.clone()))?;
            if parsed == 0 {
                return Err(ConfigError::InvalidTimeout(secs));
            }
            config.upstream_timeout_secs = Some(parsed);
        }

        if let Some(scheme) = var(ENV_CODE_SCHEME) {
            config.code_scheme = scheme.parse()?;
        }

        config.mock_dir = var(ENV_MOCK_DIR).map(PathBuf::from);

        Ok(config)
    }

    /// Set the listen address.
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Set the validation scheme.
    pub fn with_code_scheme(mut self, scheme: CodeScheme) -> Self {
        self.code_scheme = scheme;
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upstream_base_url: DEFAULT_BASE_URL.to_string(),
            upstream_timeout_secs: None,
            code_scheme: CodeScheme::TwoCharSuffix,
            mock_dir: None,
        }
    }
}
