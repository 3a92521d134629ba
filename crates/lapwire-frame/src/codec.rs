use std::io::{Cursor, Read};
use std::time::Duration;

use base64::alphabet;
use base64::engine::general_purpose::PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine;
use flate2::read::DeflateDecoder;
use serde_json::Value;

use crate::channel::ChannelSpec;
use crate::error::Result;
use crate::reader::FrameReader;

/// Record clock prefix width: `HH:MM:SS.mmm`.
pub const CLOCK_WIDTH: usize = 12;

/// Default maximum record size: 16 MiB.
pub const DEFAULT_MAX_RECORD: usize = 16 * 1024 * 1024;

pub(crate) const BOM: &str = "\u{feff}";

// The feed does not pad consistently.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One timestamped, decoded record of a stream channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Session clock at which the record was logged.
    pub timestamp: Duration,
    /// The channel this record belongs to.
    pub channel: &'static str,
    /// Decoded payload; raw text when decoding failed.
    pub payload: Value,
}

impl Frame {
    /// Create a new frame.
    pub fn new(timestamp: Duration, channel: &'static str, payload: Value) -> Self {
        Self {
            timestamp,
            channel,
            payload,
        }
    }

    /// True when the payload could not be decoded and holds raw text.
    pub fn is_raw(&self) -> bool {
        self.payload.is_string()
    }
}

/// Decoded body of a channel response.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A non-stream channel: one JSON document.
    Value(Value),
    /// A stream channel: records in capture order.
    Stream(Vec<Frame>),
}

impl Decoded {
    /// The frames of a stream channel, `None` for a single document.
    pub fn into_frames(self) -> Option<Vec<Frame>> {
        match self {
            Decoded::Stream(frames) => Some(frames),
            Decoded::Value(_) => None,
        }
    }
}

/// Configuration for record splitting.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum size of one record in bytes. Default: 16 MiB.
    pub max_record_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_record_size: DEFAULT_MAX_RECORD,
        }
    }
}

/// Parse a session clock (`HH:MM:SS.mmm`, `HH:MM:SS:mmm` is also accepted).
pub fn parse_clock(clock: &str) -> Option<Duration> {
    let mut parts = clock.trim().split([':', '.']);
    let hours: u64 = parse_digits(parts.next()?)?;
    let minutes: u64 = parse_digits(parts.next()?)?;
    let seconds: u64 = parse_digits(parts.next()?)?;
    let fraction = parts.next().unwrap_or("0");
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let nanos: u32 = format!("{fraction:0<9}").parse().ok()?;
    Some(Duration::new(hours * 3600 + minutes * 60 + seconds, nanos))
}

fn parse_digits(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Decode one payload.
///
/// `{` starts a JSON document. A quoted payload is unquoted and, on
/// compressed channels, base64-decoded and inflated before being decoded
/// again. Anything else is kept as a raw string.
pub fn decode_payload(text: &str, compressed: bool) -> Value {
    if text.starts_with('{') {
        return match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "malformed JSON payload, keeping raw text");
                Value::String(text.to_owned())
            }
        };
    }

    let body = if text.starts_with('"') {
        text.trim_matches('"')
    } else {
        text
    };

    if compressed {
        match inflate(body) {
            Ok(inner) => return decode_payload(inner.trim_start_matches(BOM), false),
            Err(err) => {
                tracing::warn!(error = %err, "undecodable compressed payload, keeping raw text");
                return Value::String(body.to_owned());
            }
        }
    }

    tracing::warn!(len = body.len(), "payload is not JSON, keeping raw text");
    Value::String(body.to_owned())
}

#[derive(Debug, thiserror::Error)]
enum InflateError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid deflate stream: {0}")]
    Deflate(#[from] std::io::Error),
    #[error("inflated payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn inflate(text: &str) -> std::result::Result<String, InflateError> {
    let packed = LENIENT_BASE64.decode(text.trim())?;
    let mut out = Vec::with_capacity(packed.len() * 4);
    DeflateDecoder::new(packed.as_slice()).read_to_end(&mut out)?;
    Ok(String::from_utf8(out)?)
}

/// Split and decode a stream channel body held in memory.
pub fn decode_stream(
    body: &[u8],
    channel: &ChannelSpec,
    config: FrameConfig,
) -> Result<Vec<Frame>> {
    let mut reader = FrameReader::with_config(Cursor::new(body), *channel, config);
    let mut frames = Vec::new();
    while let Some(frame) = reader.read_frame()? {
        frames.push(frame);
    }
    tracing::debug!(
        channel = channel.name,
        frames = frames.len(),
        skipped = reader.skipped(),
        "decoded stream"
    );
    Ok(frames)
}

/// Decode a complete channel response according to its catalog entry.
pub fn decode_response(
    body: &[u8],
    channel: &ChannelSpec,
    config: FrameConfig,
) -> Result<Decoded> {
    if channel.is_stream {
        return decode_stream(body, channel, config).map(Decoded::Stream);
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim_start_matches(BOM).trim_end();
    Ok(Decoded::Value(decode_payload(text, channel.is_compressed)))
}
