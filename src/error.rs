//! Error types for the harvest pipeline.
//!
//! Errors are split by how the pipeline reacts to them:
//!
//! - [`StoreError`]: the working directory could not be read or written.
//! - [`FetchError`]: a transport-level failure (timeout, DNS, reset). Per-item
//!   stages persist these as error artifacts rather than propagating them.
//! - [`ExtractError`]: raw markup could not be turned into a record.
//! - [`HarvestError`]: fatal, run-aborting failures. Everything else is
//!   isolated to the item it happened on.

use thiserror::Error;

/// Failure reading or writing the working directory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error on {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

/// Transport-level fetch failure. Non-2xx responses are not errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Raw markup did not yield the expected record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    #[error("Missing attribute {attr} on {element}")]
    MissingAttribute {
        element: &'static str,
        attr: &'static str,
    },

    #[error("Could not determine side for article {0:?}")]
    NoSide(String),

    #[error("Readability failed: {0}")]
    Readability(String),

    #[error("Invalid URL {0}")]
    InvalidUrl(String),
}

/// Fatal pipeline error: aborts the run with a non-zero exit status.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Could not find the last-page control on the first roundup page")]
    PaginationMissing,

    #[error("Roundup page {page} returned HTTP {status}")]
    RoundupStatus { page: u32, status: u16 },

    #[error("Roundup index {0} not found; run the roundup phase first")]
    MissingRoundupIndex(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
