//! Error types for the resolution engine.
//!
//! Fetch and parse failures never escape the resolver: they are recovered
//! into fallback streams. They are still typed so the resolver can log
//! what went wrong and tests can assert on the failure kind.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single remote fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("fetch of {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// A body that does not follow the HLS playlist grammar.
#[derive(Error, Debug)]
#[error("not a playlist: {reason}")]
pub struct ParseError {
    pub reason: String,
}

/// Anything that can go wrong while resolving one URL.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ResolveError {
    /// Short machine-friendly kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::Status { .. }) => "status",
            Self::Fetch(FetchError::Network { .. }) => "network",
            Self::Fetch(FetchError::Timeout { .. }) => "timeout",
            Self::Parse(_) => "parse",
        }
    }
}

/// Configuration file problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Result of resolving one URL.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
