//! Inbound events and outbound actions for [`crate::Client::handle`].
//!
//! Mirrors a sans-IO core: `ClientEvent` carries everything the client
//! reacts to (decoded frames, clock ticks, user command intents);
//! `ClientAction` carries everything the caller must do about it (write a
//! frame, log, notify a subscriber). The caller owns the transport and the
//! event bus; `Client` only ever returns data.

use mdp_core::StoreEvent;
use mdp_proto::{Packet, RawFrame};

/// Something for [`crate::Client`] to react to.
///
/// Generic over the instant type so a production caller uses
/// `std::time::Instant` and a simulation uses a virtual clock, matching
/// [`mdp_core::Environment::Instant`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent<I = std::time::Instant> {
    /// A frame was decoded off the wire.
    FrameReceived(Packet),
    /// The scheduler's clock advanced; time to check heartbeat/timeout due
    /// dates.
    Tick {
        /// Current time.
        now: I,
    },
    /// The transport finished connecting.
    Connected {
        /// Current time, used to seed the heartbeat schedule.
        now: I,
    },
    /// The transport disconnected; cancels in-flight timers.
    Disconnected,
    /// User command: select the focused channel.
    SetActiveChannel {
        /// Target slot.
        channel: u8,
    },
    /// User command: stage a voltage-emphasized set-point.
    SetVoltage {
        /// Target slot.
        channel: u8,
        /// Millivolts.
        voltage_mv: u16,
        /// Milliamps.
        current_ma: u16,
    },
    /// User command: stage a current-emphasized set-point.
    SetCurrent {
        /// Target slot.
        channel: u8,
        /// Millivolts.
        voltage_mv: u16,
        /// Milliamps.
        current_ma: u16,
    },
    /// User command: enable or disable a slot's output (or input, for a
    /// load). Drives the optimistic-toggle state machine.
    SetOutput {
        /// Target slot.
        channel: u8,
        /// Desired state.
        enabled: bool,
    },
    /// User command: program one slot's address and frequency.
    SetAddress {
        /// Target slot.
        channel: u8,
        /// Canonical-order address bytes.
        addr: [u8; 5],
        /// Absolute frequency in MHz.
        freq_mhz: u16,
    },
    /// User command: program all six slots' addresses and frequencies.
    SetAllAddresses {
        /// Six `(addr, frequency_mhz)` pairs, in slot order.
        records: [([u8; 5], u16); 6],
    },
    /// User command: request the current address table.
    GetAddresses,
    /// User command: request the head-unit machine-type announcement.
    GetMachine,
    /// User command: begin the device-side auto-match procedure.
    StartAutoMatch,
    /// User command: cancel the device-side auto-match procedure.
    StopAutoMatch,
    /// User command: enter device firmware update mode.
    ResetToDfu,
    /// User command: toggle the head-unit RGB indicator.
    Rgb {
        /// Desired state.
        enabled: bool,
    },
    /// The transport reported that writing an in-flight toggle's frame
    /// failed.
    ToggleSendFailed {
        /// Slot whose toggle was in flight.
        channel: u8,
        /// Transport-reported failure reason.
        reason: String,
    },
}

/// Something for the caller to do in response to a [`ClientEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Write this frame to the transport.
    Send(RawFrame),
    /// Informational log line (mirrors the teacher's log-and-continue
    /// heartbeat behavior).
    Log {
        /// Human-readable message.
        message: String,
    },
    /// A channel-store mutation occurred; forward to observers.
    Store(StoreEvent),
    /// An output/input toggle was confirmed by a matching SYNTHESIZE.
    ToggleConfirmed {
        /// Slot the toggle targeted.
        channel: u8,
        /// The confirmed state.
        state: bool,
    },
    /// An output/input toggle's 5 s timeout elapsed unconfirmed.
    ToggleTimedOut {
        /// Slot the toggle targeted.
        channel: u8,
        /// The value the displayed state was reverted to.
        reverted_to: bool,
    },
    /// An output/input toggle's frame failed to send.
    ToggleErrored {
        /// Slot the toggle targeted.
        channel: u8,
        /// The value the displayed state was reverted to.
        reverted_to: bool,
    },
}
