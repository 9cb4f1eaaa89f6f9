//! Wire framing and packet codec for the MDP-M01/M02 serial protocol.
//!
//! This crate is sans-IO: it knows how to turn a byte stream into
//! [`RawFrame`]s and a `RawFrame` into a [`Packet`], and the reverse, but it
//! never touches a transport itself. [`mdp_core`](../mdp_core/index.html)
//! and `mdp-runtime` build on top of it.

mod errors;
mod frame;
mod header;
mod packet;
mod scanner;

pub use errors::{DecodeError, FramingError};
pub use frame::RawFrame;
pub use header::{BROADCAST_CHANNEL, HEADER_LEN, MAGIC};
pub use packet::{
    AddrRecord, ChannelRecord, Command, MachineTypeTag, Packet, PacketType, WaveGroup,
};
pub use scanner::{FrameScanner, ScanEvent};
