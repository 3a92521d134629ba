use std::path::PathBuf;

/// Errors that can occur while fetching captures or using a cache.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source has no body for the channel.
    #[error("channel {channel} unavailable")]
    Unavailable { channel: String },

    /// Failed to read a capture file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a cache entry.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The cache key cannot be mapped to a storage location.
    #[error("invalid cache key: {0}")]
    InvalidKey(String),
}

impl SourceError {
    /// True when the channel simply has no data.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceError::Unavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
