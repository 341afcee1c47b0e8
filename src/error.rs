//! Error types and Result alias for winfetch

use std::path::PathBuf;

use crate::system::FactKey;

/// Result type alias for winfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the pipeline can produce.
///
/// Only `NotFound`, `UnsupportedFormat` and `Decode` for the chosen image, and
/// `Config` for a file that cannot be parsed at all, reach the user. The rest
/// are absorbed by the caller and logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file not found or unreadable: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported image format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("could not query {key}: {reason}")]
    Collection { key: FactKey, reason: String },

    #[error("failed to read cache {}: {reason}", path.display())]
    CacheRead { path: PathBuf, reason: String },

    #[error("failed to write cache {}: {reason}", path.display())]
    CacheWrite { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand used by platform probes.
    pub fn collection(key: FactKey, reason: impl Into<String>) -> Self {
        Error::Collection {
            key,
            reason: reason.into(),
        }
    }
}
