//! In-memory duplex transport pair for driving `mdp_runtime::Runtime`
//! without a real serial port — this protocol has no actual network to
//! simulate, so the teacher's `turmoil`-based cluster scales down to a
//! single unbounded channel pair.

use mdp_runtime::{Transport, TransportError};
use tokio::sync::mpsc;

/// One end of an in-memory duplex byte pipe.
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryTransport {
    /// Creates a connected pair: bytes written to one end arrive, in
    /// order, at the other.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        (
            Self { tx: tx_a, rx: rx_b },
            Self { tx: tx_b, rx: rx_a },
        )
    }
}

impl Transport for MemoryTransport {
    async fn read(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.recv().await)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(bytes.to_vec())
            .map_err(|_| TransportError::Write {
                reason: "peer end dropped".to_string(),
            })
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_delivers_bytes_in_order() {
        let (mut a, mut b) = MemoryTransport::pair();
        a.write(&[1, 2, 3]).await.unwrap();
        a.write(&[4, 5]).await.unwrap();
        assert_eq!(b.read().await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(b.read().await.unwrap(), Some(vec![4, 5]));
    }

    #[tokio::test]
    async fn dropping_one_end_signals_disconnect_on_the_other() {
        let (a, mut b) = MemoryTransport::pair();
        drop(a);
        assert_eq!(b.read().await.unwrap(), None);
    }
}
