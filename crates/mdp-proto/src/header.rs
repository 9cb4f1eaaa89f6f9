//! The 6-byte frame header shared by every MDP packet.
//!
//! Unlike the fixed-size headers this crate's sibling protocols use, the
//! MDP header only fixes the first six bytes (`magic0 magic1 type size
//! channel checksum`); the payload length follows from `size`, so there is
//! no zero-copy struct cast here, just plain byte-slice accessors.

/// The two magic bytes that open every frame.
pub const MAGIC: [u8; 2] = [0x5A, 0x5A];

/// Length of the fixed header prefix, in bytes.
pub const HEADER_LEN: u8 = 6;

/// Sentinel `channel` value meaning "no specific channel" (broadcast).
pub const BROADCAST_CHANNEL: u8 = 0xEE;

/// XOR checksum over a payload slice (header excluded).
///
/// An empty payload checksums to `0`.
#[must_use]
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::checksum;

    #[test]
    fn empty_payload_checksums_to_zero() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn checksum_is_xor_of_all_bytes() {
        assert_eq!(checksum(&[0xE4, 0x0C, 0xF4, 0x01]), 0xE4 ^ 0x0C ^ 0xF4 ^ 0x01);
    }
}
