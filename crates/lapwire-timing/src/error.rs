/// Errors that can occur while reconstructing a session's tables.
///
/// Malformed individual records never surface here; only a channel that
/// cannot be read at all does.
#[derive(Debug, thiserror::Error)]
pub enum TimingError {
    /// The channel body could not be fetched.
    #[error("source error: {0}")]
    Source(#[from] lapwire_source::SourceError),

    /// The channel body could not be split into records.
    #[error("frame error: {0}")]
    Frame(#[from] lapwire_frame::FrameError),

    /// A frame sequence was requested from a single-document channel.
    #[error("channel {channel} is not a stream")]
    NotAStream { channel: String },

    /// The channel name is not in the catalog.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

impl TimingError {
    /// True when the underlying channel has no data.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, TimingError::Source(err) if err.is_unavailable())
    }
}

pub type Result<T> = std::result::Result<T, TimingError>;
