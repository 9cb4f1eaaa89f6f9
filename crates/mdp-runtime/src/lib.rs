//! Transport adapter and event loop for the MDP-M01/M02 driver.
//!
//! Binds `mdp-client`'s command layer to a physical link: [`Transport`] is
//! the narrow duplex-byte-stream contract a caller implements (a serial
//! port in production, an in-memory pair in tests); [`Runtime`] drives the
//! read-scan-decode-dispatch cycle and the heartbeat/toggle timers.
//!
//! # Components
//!
//! - [`Transport`]: platform-specific I/O abstraction
//! - [`Runtime`]: single-threaded cooperative event loop
//! - [`DriverConfig`]: timing, debounce, and buffer knobs
//! - [`ConnectionState`]: connection lifecycle

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
mod runtime;
mod state;
mod transport;

pub use config::DriverConfig;
pub use error::{RuntimeError, TransportError};
pub use runtime::Runtime;
pub use state::ConnectionState;
pub use transport::{FlowControl, Parity, Transport, TransportConfig};

#[cfg(feature = "serial")]
pub use transport::SerialTransport;
