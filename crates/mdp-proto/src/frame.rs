//! `RawFrame`: a validated frame, already resynchronized and
//! checksum-checked by the [`crate::FrameScanner`], not yet decoded into a
//! [`crate::Packet`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::header::{checksum, BROADCAST_CHANNEL, HEADER_LEN, MAGIC};

/// A frame whose magic, length, and checksum have already been validated.
///
/// # Invariants
/// - `payload.len() + HEADER_LEN as usize == size as usize`.
/// - `checksum(&payload) == self.checksum`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Packet type tag (`SYNTHESIZE`, `HEARTBEAT`, ...).
    pub type_tag: u8,
    /// Total frame length, including the 6-byte header.
    pub size: u8,
    /// Target-channel selector, or `BROADCAST_CHANNEL` for global commands.
    pub channel: u8,
    /// Checksum byte carried in the header (XOR of `payload`).
    pub checksum: u8,
    /// Bytes following the header.
    pub payload: Bytes,
}

impl RawFrame {
    /// Builds a frame for `type_tag`/`channel` with the given payload,
    /// deriving `size` and `checksum`. Every packet this crate encodes has
    /// a payload well under 250 bytes, so the `size` truncation below never
    /// loses information in practice.
    #[must_use]
    pub fn new(type_tag: u8, channel: u8, payload: Bytes) -> Self {
        let size = (payload.len() + HEADER_LEN as usize) as u8;
        let checksum = checksum(&payload);
        Self {
            type_tag,
            size,
            channel,
            checksum,
            payload,
        }
    }

    /// A broadcast-channel frame carrying no target channel.
    #[must_use]
    pub fn broadcast(type_tag: u8, payload: Bytes) -> Self {
        Self::new(type_tag, BROADCAST_CHANNEL, payload)
    }

    /// Serializes the frame to wire bytes: `5A 5A type size channel checksum payload`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_slice(&MAGIC);
        dst.put_u8(self.type_tag);
        dst.put_u8(self.size);
        dst.put_u8(self.channel);
        dst.put_u8(self.checksum);
        dst.put_slice(&self.payload);
    }

    /// Serializes the frame into a freshly allocated `BytesMut`.
    #[must_use]
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size as usize);
        self.encode(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_size_and_checksum() {
        let frame = RawFrame::broadcast(0x22, Bytes::new());
        assert_eq!(frame.size, 6);
        assert_eq!(frame.checksum, 0);
    }

    #[test]
    fn encode_matches_heartbeat_bytes() {
        let frame = RawFrame::broadcast(0x22, Bytes::new());
        assert_eq!(&frame.to_bytes()[..], &[0x5A, 0x5A, 0x22, 0x06, 0xEE, 0x00]);
    }

    #[test]
    fn encode_set_v_matches_literal_example() {
        // voltage_mv = 3300 (0x0CE4 LE -> E4 0C), current_ma = 500 (0x01F4 LE -> F4 01)
        let payload = Bytes::from_static(&[0xE4, 0x0C, 0xF4, 0x01]);
        let frame = RawFrame::new(0x1A, 2, payload);
        assert_eq!(frame.checksum, 0x0D);
        assert_eq!(
            &frame.to_bytes()[..],
            &[0x5A, 0x5A, 0x1A, 0x0A, 0x02, 0x0D, 0xE4, 0x0C, 0xF4, 0x01]
        );
    }
}
