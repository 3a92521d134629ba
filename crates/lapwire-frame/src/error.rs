/// Errors that can occur while splitting a capture into records.
///
/// Payload problems are not errors: they degrade to raw text.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A single record exceeds the configured maximum size.
    #[error("record too large ({size} bytes, max {max})")]
    RecordTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading the capture.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
