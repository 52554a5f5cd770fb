//! Environment Canada client error types.

/// Errors from parsing a city feed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The document is not well-formed XML
    #[error("XML error: {message}")]
    Xml { message: String },

    /// No entry is categorised as current conditions
    #[error("feed has no current conditions entry")]
    MissingCurrentConditions,

    /// A numeric field could not be read
    #[error("invalid {field} value: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Errors from fetching current conditions upstream.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The feed could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Mock mode has no feed for this code
    #[error("no mock feed for {code}")]
    MockMissing { code: String },

    /// Mock feed directory could not be loaded
    #[error("mock data error: {message}")]
    Mock { message: String },
}
