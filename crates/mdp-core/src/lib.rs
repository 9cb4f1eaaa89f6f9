//! Channel store, validation, and time abstraction for the MDP-M01/M02
//! driver.
//!
//! Built directly on [`mdp_proto`]'s decoded [`mdp_proto::Packet`]s; this
//! crate never touches bytes or a transport itself.

mod env;
mod error;
mod store;

pub use env::{Environment, RealClock, SimClock};
pub use error::ValidationError;
pub use store::{
    ChannelSlot, ChannelStore, ChannelStoreSnapshot, HeadUnitType, Mode, Rgb, StoreEvent,
    WaveformSample, WAVE_TIMESTAMP_UNIT_US,
};
