//! Transport adapter contract: a single duplex byte stream between the
//! [`crate::Runtime`] and the physical link. `mdp-proto`'s [`mdp_proto::FrameScanner`]
//! already does the framing, so this trait stays narrower than a framed
//! channel — it only has to move bytes.

use std::future::Future;

use crate::error::TransportError;

/// Parity setting for a serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// No parity bit.
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Flow control setting for a serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    /// No flow control.
    None,
    /// XON/XOFF software flow control.
    Software,
    /// RTS/CTS hardware flow control.
    Hardware,
}

/// Serial line configuration. Defaults match the MDP-M01/M02's USB-CDC
/// defaults (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Baud rate.
    pub baud: u32,
    /// Data bits per frame.
    pub data_bits: u8,
    /// Stop bits per frame.
    pub stop_bits: u8,
    /// Parity setting.
    pub parity: Parity,
    /// Flow control setting.
    pub flow_control: FlowControl,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            baud: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// A duplex byte stream the [`crate::Runtime`] drives.
///
/// `read` returns `Ok(None)` when the link closes cleanly (EOF), distinct
/// from an `Err`, mirroring the teacher's `Driver::recv_frame` returning
/// `Option` for a closed stream.
pub trait Transport: Send {
    /// Reads whatever bytes are currently available, blocking until at
    /// least one byte arrives or the link closes.
    fn read(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Writes `bytes` to the link in full.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the link. Best-effort; errors are not surfaced.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

#[cfg(feature = "serial")]
mod serial {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_serial::SerialPortBuilderExt;

    use super::{FlowControl, Parity, Transport, TransportConfig, TransportError};

    fn to_tokio_data_bits(bits: u8) -> tokio_serial::DataBits {
        match bits {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        }
    }

    fn to_tokio_stop_bits(bits: u8) -> tokio_serial::StopBits {
        match bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        }
    }

    fn to_tokio_parity(parity: Parity) -> tokio_serial::Parity {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }

    fn to_tokio_flow_control(flow_control: FlowControl) -> tokio_serial::FlowControl {
        match flow_control {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }

    /// A [`Transport`] backed by a USB-CDC serial port, opened via
    /// `tokio-serial` (which wraps the `serialport` crate's port
    /// enumeration and configuration with an async-compatible stream).
    pub struct SerialTransport {
        port: tokio_serial::SerialStream,
    }

    impl SerialTransport {
        /// Opens `path` with the given line configuration.
        pub fn open(path: &str, config: TransportConfig) -> Result<Self, TransportError> {
            let port = tokio_serial::new(path, config.baud)
                .data_bits(to_tokio_data_bits(config.data_bits))
                .stop_bits(to_tokio_stop_bits(config.stop_bits))
                .parity(to_tokio_parity(config.parity))
                .flow_control(to_tokio_flow_control(config.flow_control))
                .open_native_async()
                .map_err(|err| TransportError::Open {
                    reason: err.to_string(),
                })?;
            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        async fn read(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
            let mut buf = [0u8; 1024];
            match self.port.read(&mut buf).await {
                Ok(0) => Ok(None),
                Ok(n) => Ok(Some(buf[..n].to_vec())),
                Err(err) => Err(TransportError::Read {
                    reason: err.to_string(),
                }),
            }
        }

        async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.port
                .write_all(bytes)
                .await
                .map_err(|err| TransportError::Write {
                    reason: err.to_string(),
                })
        }

        async fn close(&mut self) {
            let _ = self.port.flush().await;
        }
    }
}

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
