//! Error types for the channel store and validation logic.

use thiserror::Error;

/// A SYNTHESIZE record failed range validation (spec §4.3 step 2).
///
/// The offending slot is still accepted at the protocol layer; the store
/// forces it offline and surfaces this as a warning rather than dropping
/// the whole SYNTHESIZE packet.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// `out_v`/`in_v` outside `[0, 50]` volts.
    #[error("voltage {volts} V out of range [0, 50] on channel {channel}")]
    VoltageOutOfRange {
        /// Slot index.
        channel: u8,
        /// The out-of-range value, volts.
        volts: f32,
    },
    /// `out_i`/`in_i` outside `[0, 10]` amps.
    #[error("current {amps} A out of range [0, 10] on channel {channel}")]
    CurrentOutOfRange {
        /// Slot index.
        channel: u8,
        /// The out-of-range value, amps.
        amps: f32,
    },
    /// Temperature outside `[-10, 85]` degrees Celsius.
    #[error("temperature {celsius} C out of range [-10, 85] on channel {channel}")]
    TemperatureOutOfRange {
        /// Slot index.
        channel: u8,
        /// The out-of-range value, degrees Celsius.
        celsius: f32,
    },
    /// The raw `machine_type` byte matched none of `{Node, P905, P906, L1060}`.
    #[error("unknown machine type {raw:#04x} on channel {channel}")]
    UnknownMachineType {
        /// Slot index.
        channel: u8,
        /// The unrecognized raw byte.
        raw: u8,
    },
}
