use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::channel::ChannelSpec;
use crate::codec::{decode_payload, parse_clock, Frame, FrameConfig, BOM, CLOCK_WIDTH};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;
const RECORD_SEPARATOR: &[u8] = b"\r\n";

/// Reads decoded frames from any `Read` stream of a stream channel.
///
/// Handles partial reads internally: callers always get complete records.
/// Records that cannot be timestamped are skipped; the unterminated tail of
/// a capture is discarded.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    channel: ChannelSpec,
    config: FrameConfig,
    // Bytes of `buf` already searched for a separator.
    scanned: usize,
    at_start: bool,
    eof: bool,
    records: usize,
    skipped: usize,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T, channel: ChannelSpec) -> Self {
        Self::with_config(inner, channel, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, channel: ChannelSpec, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            channel,
            config,
            scanned: 0,
            at_start: true,
            eof: false,
            records: 0,
            skipped: 0,
        }
    }

    /// Read the next frame (blocking).
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if self.at_start && (self.buf.len() >= BOM.len() || self.eof) {
                if self.buf.starts_with(BOM.as_bytes()) {
                    self.buf.advance(BOM.len());
                }
                self.at_start = false;
            }

            if !self.at_start {
                if let Some(record) = self.split_record()? {
                    self.records += 1;
                    match self.decode_record(&record) {
                        Some(frame) => return Ok(Some(frame)),
                        None => {
                            self.skipped += 1;
                            continue;
                        }
                    }
                }

                if self.eof {
                    if !self.buf.is_empty() {
                        tracing::warn!(
                            channel = self.channel.name,
                            bytes = self.buf.len(),
                            "discarding unterminated trailing record"
                        );
                        self.buf.clear();
                        self.scanned = 0;
                    }
                    return Ok(None);
                }
            }

            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn split_record(&mut self) -> Result<Option<BytesMut>> {
        let from = self.scanned.saturating_sub(RECORD_SEPARATOR.len() - 1);
        let found = self.buf[from..]
            .windows(RECORD_SEPARATOR.len())
            .position(|w| w == RECORD_SEPARATOR)
            .map(|pos| from + pos);

        match found {
            Some(end) => {
                if end > self.config.max_record_size {
                    return Err(FrameError::RecordTooLarge {
                        size: end,
                        max: self.config.max_record_size,
                    });
                }
                let record = self.buf.split_to(end);
                self.buf.advance(RECORD_SEPARATOR.len());
                self.scanned = 0;
                Ok(Some(record))
            }
            None => {
                if self.buf.len() > self.config.max_record_size {
                    return Err(FrameError::RecordTooLarge {
                        size: self.buf.len(),
                        max: self.config.max_record_size,
                    });
                }
                self.scanned = self.buf.len();
                Ok(None)
            }
        }
    }

    fn decode_record(&self, record: &[u8]) -> Option<Frame> {
        let text = match std::str::from_utf8(record) {
            Ok(text) => std::borrow::Cow::Borrowed(text),
            Err(err) => {
                tracing::warn!(
                    channel = self.channel.name,
                    record = self.records,
                    error = %err,
                    "record is not UTF-8, decoding lossily"
                );
                String::from_utf8_lossy(record)
            }
        };

        if text.len() < CLOCK_WIDTH || !text.is_char_boundary(CLOCK_WIDTH) {
            tracing::warn!(
                channel = self.channel.name,
                record = self.records,
                "record shorter than its clock prefix, skipping"
            );
            return None;
        }

        let (clock, payload) = text.split_at(CLOCK_WIDTH);
        let Some(timestamp) = parse_clock(clock) else {
            tracing::warn!(
                channel = self.channel.name,
                record = self.records,
                clock,
                "unparsable record clock, skipping"
            );
            return None;
        };

        Some(Frame::new(
            timestamp,
            self.channel.name,
            decode_payload(payload, self.channel.is_compressed),
        ))
    }

    /// Number of records split so far, skipped ones included.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Number of records skipped because they carried no usable clock.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The channel this reader decodes.
    pub fn channel(&self) -> &ChannelSpec {
        &self.channel
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::channel::TIMING_DATA;

    fn reader_over(body: &str) -> FrameReader<Cursor<Vec<u8>>> {
        FrameReader::new(Cursor::new(body.as_bytes().to_vec()), TIMING_DATA)
    }

    #[test]
    fn read_multiple_frames() {
        let mut reader = reader_over(concat!(
            "00:00:01.000{\"n\":1}\r\n",
            "00:00:02.000{\"n\":2}\r\n",
            "00:00:03.000{\"n\":3}\r\n",
        ));

        for n in 1..=3u64 {
            let frame = reader.read_frame().unwrap().unwrap();
            assert_eq!(frame.timestamp, Duration::from_secs(n));
            assert_eq!(frame.payload, json!({ "n": n }));
        }
        assert!(reader.read_frame().unwrap().is_none());
        assert_eq!(reader.records(), 3);
    }

    #[test]
    fn empty_stream() {
        let mut reader = reader_over("");
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn strips_leading_bom() {
        let mut reader = reader_over("\u{feff}00:00:00.100{\"a\":1}\r\n");
        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.timestamp, Duration::from_millis(100));
        assert_eq!(frame.payload, json!({"a": 1}));
    }

    #[test]
    fn discards_unterminated_tail() {
        let mut reader = reader_over("00:00:01.000{\"a\":1}\r\n00:00:02.000{\"a\":");
        assert!(reader.read_frame().unwrap().is_some());
        assert!(reader.read_frame().unwrap().is_none());
        assert_eq!(reader.records(), 1);
    }

    #[test]
    fn skips_records_without_clock() {
        let mut reader = reader_over("garbage\r\nxx:yy:zz.www{}\r\n00:00:05.000{}\r\n");
        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.timestamp, Duration::from_secs(5));
        assert_eq!(reader.skipped(), 2);
    }

    #[test]
    fn partial_read_handling() {
        let body = "\u{feff}00:00:04.000{\"slow\":true}\r\n";
        let byte_reader = ByteByByteReader {
            bytes: body.as_bytes().to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader, TIMING_DATA);

        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.timestamp, Duration::from_secs(4));
        assert_eq!(frame.payload, json!({"slow": true}));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn oversized_record_in_stream() {
        let cfg = FrameConfig {
            max_record_size: 16,
        };
        let body = format!("00:00:00.000{}\r\n", "x".repeat(64));
        let mut reader =
            FrameReader::with_config(Cursor::new(body.into_bytes()), TIMING_DATA, cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::RecordTooLarge { .. }));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: b"00:00:08.000{\"ok\":1}\r\n".to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader, TIMING_DATA);
        let frame = framed.read_frame().unwrap().unwrap();

        assert_eq!(frame.timestamp, Duration::from_secs(8));
        assert_eq!(frame.channel, "timing_data");
    }

    #[test]
    fn read_error_propagates() {
        let reader = InterruptedThenData {
            state: 2,
            bytes: Vec::new(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader, TIMING_DATA);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.state {
                0 => {
                    self.state = 1;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                2 => return Err(std::io::Error::from(ErrorKind::WouldBlock)),
                _ => {}
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn accessors_and_into_inner() {
        let reader = reader_over("");
        assert_eq!(reader.channel().name, "timing_data");
        assert_eq!(reader.config().max_record_size, crate::DEFAULT_MAX_RECORD);
        let _inner = reader.into_inner();
    }
}
