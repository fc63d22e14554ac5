//! Error types for content fetching and page rendering

use thiserror::Error;

/// Result type alias for blog operations
pub type Result<T> = std::result::Result<T, BlogError>;

/// Errors surfaced by the content adapter and the page controllers
#[derive(Error, Debug)]
pub enum BlogError {
    /// Transport failure, non-success status, or an unparseable response body
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// No document matches the requested slug
    #[error("post '{slug}' not found")]
    NotFound { slug: String },

    /// A fetched record does not match the expected schema
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    /// `load_more` was called after the last page was reached
    #[error("no further pages to load")]
    NoMorePages,

    /// Invalid site configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Template rendering errors
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// File system errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlogError {
    /// Create a network error for a URL
    pub fn network<T: ToString>(url: &str, reason: T) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a malformed record error
    pub fn malformed<T: ToString>(reason: T) -> Self {
        Self::MalformedRecord {
            reason: reason.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config<T: ToString>(message: T) -> Self {
        Self::Config(message.to_string())
    }

    /// Whether the error came from the network layer
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Whether the error means the requested post does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
