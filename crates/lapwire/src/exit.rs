use std::fmt;
use std::io;

use lapwire_frame::FrameError;
use lapwire_source::SourceError;
use lapwire_timing::TimingError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const UNAVAILABLE: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => UNAVAILABLE,
        io::ErrorKind::PermissionDenied => FAILURE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn source_error(context: &str, err: SourceError) -> CliError {
    match err {
        SourceError::Read { source, .. } | SourceError::Write { source, .. } => {
            io_error(context, source)
        }
        SourceError::Unavailable { .. } => CliError::new(UNAVAILABLE, format!("{context}: {err}")),
        SourceError::InvalidKey(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::RecordTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn timing_error(context: &str, err: TimingError) -> CliError {
    match err {
        TimingError::Source(err) => source_error(context, err),
        TimingError::Frame(err) => frame_error(context, err),
        TimingError::NotAStream { .. } | TimingError::UnknownChannel(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_channel_maps_to_3() {
        let err = TimingError::Source(SourceError::Unavailable {
            channel: "car_data".into(),
        });
        let cli = timing_error("car data", err);
        assert_eq!(cli.code, UNAVAILABLE);
        assert_eq!(cli.message, "car data: channel car_data unavailable");
    }

    #[test]
    fn oversized_record_is_invalid_data() {
        let err = TimingError::Frame(FrameError::RecordTooLarge { size: 10, max: 4 });
        assert_eq!(timing_error("laps", err).code, DATA_INVALID);
    }

    #[test]
    fn catalog_misses_are_usage_errors() {
        let err = TimingError::UnknownChannel("pit_lane".into());
        assert_eq!(timing_error("decode", err).code, USAGE);
    }

    #[test]
    fn read_errors_follow_io_kind() {
        let err = SourceError::Read {
            path: "TimingData.jsonStream".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(source_error("laps", err).code, FAILURE);
    }
}
