//! Resynchronizing frame scanner: turns an unbounded byte stream into a
//! sequence of validated [`RawFrame`]s, tolerating concatenation,
//! fragmentation, and garbage.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::errors::FramingError;
use crate::frame::RawFrame;
use crate::header::{checksum, HEADER_LEN, MAGIC};

/// Above this many buffered bytes with no magic in sight, the buffer is
/// presumed to be a garbage storm and discarded outright.
const GARBAGE_CAP: usize = 256;

/// One outcome of scanning the buffer: either a validated frame, or a
/// non-fatal diagnostic the scanner recovered from on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A frame whose magic, size, and checksum all validated.
    Frame(RawFrame),
    /// A recoverable framing problem the scanner resynchronized past.
    Diagnostic(FramingError),
}

/// Scans a buffer for at most one event, mutating it in place.
///
/// Returns `None` when the buffer holds no complete event yet (more bytes
/// are needed). This is the core of spec §4.1's algorithm and is shared by
/// [`FrameScanner::feed`] and the [`Decoder`] impl so both drive identical
/// logic over their own buffer.
fn scan_one(buf: &mut BytesMut, garbage_cap: usize) -> Option<ScanEvent> {
    let magic_pos = buf.windows(2).position(|w| w == MAGIC);
    match magic_pos {
        None => {
            if buf.len() > garbage_cap {
                let discarded = buf.len();
                buf.clear();
                Some(ScanEvent::Diagnostic(FramingError::BadMagic { discarded }))
            } else {
                None
            }
        }
        Some(0) => {
            if buf.len() < 4 {
                return None;
            }
            let size = buf[3];
            if size < HEADER_LEN {
                buf.advance(2);
                return Some(ScanEvent::Diagnostic(FramingError::ShortSize));
            }
            if buf.len() < size as usize {
                return None;
            }
            let type_tag = buf[2];
            let channel = buf[4];
            let header_checksum = buf[5];
            let payload: Bytes = buf.split_to(size as usize).split_off(6).freeze();
            let actual = checksum(&payload);
            if actual != header_checksum {
                return Some(ScanEvent::Diagnostic(FramingError::ChecksumMismatch {
                    expected: header_checksum,
                    actual,
                }));
            }
            Some(ScanEvent::Frame(RawFrame {
                type_tag,
                size,
                channel,
                checksum: header_checksum,
                payload,
            }))
        }
        Some(garbage_len) => {
            buf.advance(garbage_len);
            Some(ScanEvent::Diagnostic(FramingError::BadMagic {
                discarded: garbage_len,
            }))
        }
    }
}

/// Owns the receive buffer and resynchronizes on `5A 5A` across arbitrarily
/// fragmented reads.
///
/// The buffer belongs solely to the scanner (spec §5's "shared resources"
/// note); nothing downstream of [`FrameScanner::feed`] ever sees partial
/// frames.
#[derive(Debug)]
pub struct FrameScanner {
    buf: BytesMut,
    garbage_cap: usize,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self {
            buf: BytesMut::new(),
            garbage_cap: GARBAGE_CAP,
        }
    }
}

impl FrameScanner {
    /// Creates an empty scanner with the default 256-byte garbage cap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scanner with a caller-chosen garbage cap (spec
    /// §4.1's "presumed to be a garbage storm" threshold).
    #[must_use]
    pub fn with_garbage_cap(garbage_cap: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            garbage_cap,
        }
    }

    /// Appends `bytes` to the internal buffer and drains every event that
    /// can be produced from the result, in byte-stream order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ScanEvent> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(event) = scan_one(&mut self.buf, self.garbage_cap) {
            events.push(event);
        }
        events
    }
}

/// Adapts [`FrameScanner`]'s algorithm to [`tokio_util::codec::Framed`].
///
/// Diagnostics (`BadMagic`, `ShortSize`, `ChecksumMismatch`) are logged and
/// swallowed rather than surfaced as `Err`, matching spec §4.1: "None are
/// fatal; the scanner is a pure resynchronizer." Operates directly on the
/// buffer `Framed` hands in, so no bytes are double-buffered against
/// `self.buf` (that field exists only for the standalone `feed` API).
impl Decoder for FrameScanner {
    type Item = RawFrame;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match scan_one(src, self.garbage_cap) {
                Some(ScanEvent::Frame(frame)) => return Ok(Some(frame)),
                Some(ScanEvent::Diagnostic(FramingError::BadMagic { discarded })) => {
                    tracing::debug!(discarded, "discarded garbage bytes before magic");
                }
                Some(ScanEvent::Diagnostic(err @ FramingError::ShortSize))
                | Some(ScanEvent::Diagnostic(err @ FramingError::ChecksumMismatch { .. })) => {
                    tracing::warn!(%err, "dropped frame");
                }
                None => return Ok(None),
            }
        }
    }
}
