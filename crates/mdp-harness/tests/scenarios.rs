//! End-to-end scenarios: a full [`Runtime`] driven against a scripted
//! device over [`MemoryTransport`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mdp_client::{ClientAction, ClientEvent};
use mdp_core::{Environment, SimClock};
use mdp_harness::{invariants, MemoryTransport};
use mdp_proto::{PacketType, RawFrame};
use mdp_runtime::{Runtime, Transport};

const CHANNEL_RECORD_LEN: usize = 25;

fn blank_record_bytes(num: u8, online: bool, output_on: bool) -> [u8; CHANNEL_RECORD_LEN] {
    let mut record = [0u8; CHANNEL_RECORD_LEN];
    record[0] = num;
    record[15] = u8::from(online);
    record[19] = u8::from(output_on);
    record
}

fn synthesize_frame(focused_channel: u8) -> RawFrame {
    let mut payload = Vec::new();
    for i in 0..6u8 {
        payload.extend_from_slice(&blank_record_bytes(i, true, false));
    }
    RawFrame::new(
        PacketType::Synthesize.to_u8(),
        focused_channel,
        bytes::Bytes::from(payload),
    )
}

fn machine_frame() -> RawFrame {
    RawFrame::broadcast(PacketType::Machine.to_u8(), bytes::Bytes::from_static(&[0, 0, 1]))
}

#[tokio::test(start_paused = true)]
async fn s7_toggle_reverts_after_five_seconds_with_no_synthesize() {
    let (runtime_transport, _device) = MemoryTransport::pair();
    let mut runtime = Runtime::new(runtime_transport, SimClock);

    let actions = Arc::new(Mutex::new(Vec::new()));
    let sink = actions.clone();
    runtime.subscribe(move |action| sink.lock().unwrap().push(action.clone()));

    runtime.connect().await.unwrap();
    runtime
        .handle(ClientEvent::SetOutput {
            channel: 0,
            enabled: true,
        })
        .await
        .unwrap();

    // A second toggle during the pending window must be ignored, not
    // queued or restarted.
    runtime
        .handle(ClientEvent::SetOutput {
            channel: 0,
            enabled: false,
        })
        .await
        .unwrap();

    tokio::time::advance(Duration::from_millis(5000)).await;
    runtime
        .handle(ClientEvent::Tick { now: SimClock.now() })
        .await
        .unwrap();

    let seen = actions.lock().unwrap();
    assert!(seen.iter().any(|a| matches!(
        a,
        ClientAction::ToggleTimedOut {
            channel: 0,
            reverted_to: false
        }
    )));
    let toggle_sends = seen
        .iter()
        .filter(|a| matches!(
            a,
            ClientAction::Send(frame) if frame.type_tag == PacketType::SetIsOutput.to_u8()
        ))
        .count();
    assert_eq!(toggle_sends, 1, "the ignored second SetOutput must not send a frame");
}

#[tokio::test(start_paused = true)]
async fn synthesize_frame_updates_snapshot_and_holds_universal_invariants() {
    let (runtime_transport, mut device) = MemoryTransport::pair();
    let mut runtime = Runtime::new(runtime_transport, SimClock);

    runtime.connect().await.unwrap();
    device.write(&machine_frame().to_bytes()).await.unwrap();
    runtime.process_cycle().await.unwrap();

    let frame = synthesize_frame(3);
    assert!(invariants::frame_header_is_consistent(&frame));
    device.write(&frame.to_bytes()).await.unwrap();
    runtime.process_cycle().await.unwrap();

    let snapshot = runtime.snapshot();
    assert!(invariants::power_matches_voltage_times_current(&snapshot, 0.01));
    assert!(invariants::address_empty_matches_zero_address(&snapshot));
    assert!(invariants::frequency_in_valid_range(&snapshot));
    assert!(snapshot.slots[0].online);
}

#[tokio::test(start_paused = true)]
async fn device_disconnect_stops_the_loop() {
    let (runtime_transport, device) = MemoryTransport::pair();
    let mut runtime = Runtime::new(runtime_transport, SimClock);

    runtime.connect().await.unwrap();
    drop(device);

    let continued = runtime.process_cycle().await.unwrap();
    assert!(!continued);
}
