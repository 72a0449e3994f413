//! Error types for the resolution engine.
//!
//! Only [`ResolveError`] ever reaches a caller of `Resolver::resolve`.
//! [`TransportError`] is consumed inside the engine and turned into a
//! breaker trip plus a mirror fallback.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The query failed normalization. No I/O was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No candidates were discovered for the query.
    #[error("no results found for {0}")]
    NotFound(String),

    /// The mirror could not be read. There is no further fallback.
    #[error("mirror storage failure: {0}")]
    StorageFailure(#[from] MirrorError),
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ResolveError::InvalidInput(_))
    }
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("failed opening mirror database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("mirror query on `{table}` failed ({context}): {source}")]
    Query {
        table: &'static str,
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("mirror table `{0}` is not loaded")]
    MissingTable(&'static str),
}

/// A remote call that produced no usable answer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{registry} request failed: {message}")]
    Request {
        registry: &'static str,
        message: String,
    },

    #[error("{registry} returned status {status}: {body}")]
    Status {
        registry: &'static str,
        status: u16,
        body: String,
    },

    #[error("{registry} returned an undecodable body: {message}")]
    Decode {
        registry: &'static str,
        message: String,
    },

    #[error("{registry} did not answer within {timeout:?}")]
    Timeout {
        registry: &'static str,
        timeout: Duration,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid resolver config JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
