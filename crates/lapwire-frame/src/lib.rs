//! Clock-prefixed JSON stream framing for live-timing captures.
//!
//! This is the lowest decoding layer of lapwire. A stream channel body is a
//! sequence of CRLF-terminated records, each made of:
//! - A 12-character session clock (`HH:MM:SS.mmm`)
//! - A payload: plain JSON, a quoted string, or (on compressed channels)
//!   a quoted base64 string wrapping raw-deflated JSON
//!
//! A single malformed record never aborts the stream; it degrades to raw
//! text and a warning.

pub mod channel;
pub mod codec;
pub mod error;
pub mod reader;

pub use channel::{lookup, ChannelSpec, CAR_DATA, CATALOG, POSITION, TIMING_APP_DATA, TIMING_DATA};
pub use codec::{
    decode_payload, decode_response, decode_stream, parse_clock, Decoded, Frame, FrameConfig,
    CLOCK_WIDTH, DEFAULT_MAX_RECORD,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
