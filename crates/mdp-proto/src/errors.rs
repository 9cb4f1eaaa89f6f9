use thiserror::Error;

/// Local framing failures the scanner recovers from on its own. Carried
/// inside a [`crate::ScanEvent::Diagnostic`] rather than returned as a hard
/// `Err`: spec §4.1 states "None are fatal; the scanner is a pure
/// resynchronizer."
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// Bytes preceding the next magic occurrence (or the whole buffer, if
    /// the garbage cap was exceeded) were discarded.
    #[error("discarded {discarded} byte(s) of garbage before magic")]
    BadMagic {
        /// Number of bytes discarded.
        discarded: usize,
    },
    /// `size` was below the minimum header length; the magic bytes were
    /// dropped so scanning could resume past them.
    #[error("dropped frame with undersized length field")]
    ShortSize,
    /// The payload checksum did not match the header's checksum byte; the
    /// frame was dropped.
    #[error("checksum mismatch: expected {expected:#04x}, computed {actual:#04x}")]
    ChecksumMismatch {
        /// Checksum byte carried in the header.
        expected: u8,
        /// Checksum computed over the payload.
        actual: u8,
    },
}

/// Packet decode failures. The packet codec reports these per-frame; the
/// caller logs and continues rather than treating them as fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No known packet type matches this tag.
    #[error("unknown packet type {type_tag:#04x}")]
    UnknownType {
        /// The unrecognized type byte.
        type_tag: u8,
    },
    /// The payload was shorter than the minimum required for this type.
    #[error("payload too short for type {type_tag:#04x}: expected at least {expected}, got {actual}")]
    PayloadTooShort {
        /// The packet's type byte.
        type_tag: u8,
        /// Minimum payload length this type requires.
        expected: usize,
        /// Actual payload length received.
        actual: usize,
    },
    /// The payload length did not match the fixed length this type expects.
    #[error("payload length mismatch for type {type_tag:#04x}: expected {expected}, got {actual}")]
    PayloadLengthMismatch {
        /// The packet's type byte.
        type_tag: u8,
        /// Exact payload length this type expects.
        expected: usize,
        /// Actual payload length received.
        actual: usize,
    },
}
