//! Property-based tests for frame scanning and command encoding.
//!
//! These verify the universal invariants spec §8 states hold for ALL valid
//! inputs, not just the literal scenario examples, using proptest to
//! generate arbitrary frames and commands.

use bytes::Bytes;
use mdp_proto::{BROADCAST_CHANNEL, Command, FrameScanner, RawFrame, ScanEvent};
use proptest::prelude::*;

/// Strategy for generating arbitrary raw frames via valid payloads.
fn arbitrary_frame() -> impl Strategy<Value = RawFrame> {
    (
        any::<u8>(),
        any::<u8>(),
        prop::collection::vec(any::<u8>(), 0..200),
    )
        .prop_map(|(type_tag, channel, payload)| {
            RawFrame::new(type_tag, channel, Bytes::from(payload))
        })
}

#[test]
fn prop_frame_structural_invariants_hold() {
    proptest!(|(frame in arbitrary_frame())| {
        let bytes = frame.to_bytes();

        // Invariant 1: len(F) = F[3], F[0] = F[1] = 0x5A, F[5] = XOR(F[6..])
        prop_assert_eq!(bytes.len(), bytes[3] as usize, "frame length must match size byte");
        prop_assert_eq!(bytes[0], 0x5A);
        prop_assert_eq!(bytes[1], 0x5A);
        let expected_checksum = bytes[6..].iter().fold(0u8, |acc, b| acc ^ b);
        prop_assert_eq!(bytes[5], expected_checksum);
    });
}

#[test]
fn prop_single_frame_feed_round_trips() {
    proptest!(|(frame in arbitrary_frame())| {
        let bytes = frame.to_bytes();
        let mut scanner = FrameScanner::new();
        let events = scanner.feed(&bytes);

        prop_assert_eq!(events.len(), 1, "exactly one event per well-formed frame");
        match &events[0] {
            ScanEvent::Frame(decoded) => {
                prop_assert_eq!(decoded, &frame);
            }
            other => prop_assert!(false, "expected Frame, got {other:?}"),
        }
    });
}

#[test]
fn prop_fragmentation_is_invariant_across_split_points() {
    proptest!(|(
        frames in prop::collection::vec(arbitrary_frame(), 1..6),
        split_len in 1usize..7,
    )| {
        let mut whole = Vec::new();
        for frame in &frames {
            whole.extend_from_slice(&frame.to_bytes());
        }

        let mut one_shot = FrameScanner::new();
        let baseline = one_shot.feed(&whole);

        let mut fragmented = FrameScanner::new();
        let mut events = Vec::new();
        for chunk in whole.chunks(split_len) {
            events.extend(fragmented.feed(chunk));
        }

        prop_assert_eq!(baseline, events, "fragmentation must not change the emitted event sequence");
    });
}

fn arbitrary_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Heartbeat),
        (any::<u16>(), any::<u16>()).prop_map(|(voltage_mv, current_ma)| Command::SetV {
            voltage_mv,
            current_ma
        }),
        (any::<u16>(), any::<u16>()).prop_map(|(voltage_mv, current_ma)| Command::SetI {
            voltage_mv,
            current_ma
        }),
        any::<bool>().prop_map(|state| Command::SetIsOutput { state }),
        Just(Command::SetCh),
        any::<bool>().prop_map(|state| Command::Rgb { state }),
        Just(Command::GetAddr),
        Just(Command::GetMachine),
        Just(Command::ResetToDfu),
        Just(Command::StartAutoMatch),
        Just(Command::StopAutoMatch),
    ]
}

#[test]
fn prop_command_frames_scan_back_to_one_frame_event() {
    proptest!(|(command in arbitrary_command(), channel in any::<u8>())| {
        let frame = command.encode(channel);
        let mut scanner = FrameScanner::new();
        let events = scanner.feed(&frame.to_bytes());

        prop_assert_eq!(events.len(), 1);
        prop_assert_eq!(&events[0], &ScanEvent::Frame(frame));
    });
}

#[test]
fn s1_heartbeat_literal_bytes() {
    let frame = Command::Heartbeat.encode(BROADCAST_CHANNEL);
    assert_eq!(&frame.to_bytes()[..], &[0x5A, 0x5A, 0x22, 0x06, 0xEE, 0x00]);
}
