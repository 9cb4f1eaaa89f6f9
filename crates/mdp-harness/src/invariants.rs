//! Universal invariant checks (spec.md §8), applied against scanner
//! output and channel-store snapshots from an end-to-end run.

use mdp_core::ChannelStoreSnapshot;
use mdp_proto::RawFrame;

/// Invariant 1: every frame's header is self-consistent — `len == size`,
/// both magic bytes are `0x5A`, and the checksum byte is the XOR of the
/// payload.
#[must_use]
pub fn frame_header_is_consistent(frame: &RawFrame) -> bool {
    let bytes = frame.to_bytes();
    let payload_checksum = bytes[6..].iter().fold(0u8, |acc, b| acc ^ b);
    bytes.len() == frame.size as usize
        && bytes[0] == 0x5A
        && bytes[1] == 0x5A
        && bytes[5] == payload_checksum
}

/// Invariant 4: for every slot, `|power - voltage * current| < eps`.
#[must_use]
pub fn power_matches_voltage_times_current(snapshot: &ChannelStoreSnapshot, eps: f32) -> bool {
    snapshot.slots.iter().all(|slot| {
        (slot.output_power_w - slot.output_voltage_v * slot.output_current_a).abs() < eps
    })
}

/// Invariant 5: `address_empty(slot) <=> slot.address == [0,0,0,0,0]`.
#[must_use]
pub fn address_empty_matches_zero_address(snapshot: &ChannelStoreSnapshot) -> bool {
    snapshot
        .slots
        .iter()
        .all(|slot| slot.address_empty == (slot.address == [0u8; 5]))
}

/// Invariant 6: `frequency = 2400 + freq_offset`, `freq_offset in [0, 255]`.
#[must_use]
pub fn frequency_in_valid_range(snapshot: &ChannelStoreSnapshot) -> bool {
    snapshot.slots.iter().all(|slot| {
        let offset = i32::from(slot.frequency_mhz) - 2400;
        (0..=255).contains(&offset)
    })
}

