//! Deterministic simulated transport and invariant checks for end-to-end
//! testing of the MDP-M01/M02 driver.
//!
//! `MemoryTransport` replaces the teacher's `turmoil`-based simulated
//! cluster: this protocol has no real network to simulate, only a single
//! duplex serial line, so an in-memory channel pair is sufficient to
//! drive a full `Runtime` against a scripted "device" peer.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod memory_transport;
pub mod invariants;

pub use memory_transport::MemoryTransport;
