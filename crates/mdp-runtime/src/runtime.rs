//! Single-threaded cooperative event loop binding a [`Transport`] to the
//! command layer.
//!
//! Each cycle races reading bytes from the transport against a tick
//! timer (spec.md §5's "awaiting bytes" / "awaiting the next heartbeat
//! tick" / "awaiting the optimistic-toggle timeout" suspension points
//! collapsed into one `select!`), then feeds any bytes through the frame
//! scanner and advances the heartbeat and toggle timers regardless —
//! grounded in the teacher's `process_cycle` shape but without an
//! App/Bridge split: this driver has no UI layer of its own.

use mdp_client::{Client, ClientEvent};
use mdp_core::{ChannelStoreSnapshot, Environment};
use mdp_proto::{FrameScanner, Packet, PacketType, RawFrame, ScanEvent};

use crate::config::DriverConfig;
use crate::error::RuntimeError;
use crate::state::ConnectionState;
use crate::transport::Transport;

/// Binds a [`Transport`] to a [`Client`] and drives both to completion.
pub struct Runtime<T: Transport, E: Environment> {
    transport: T,
    scanner: FrameScanner,
    client: Client<E>,
    env: E,
    tick_interval: std::time::Duration,
    state: ConnectionState,
}

impl<T: Transport, E: Environment> Runtime<T, E> {
    /// Builds a runtime with default configuration.
    #[must_use]
    pub fn new(transport: T, env: E) -> Self {
        Self::with_config(transport, env, DriverConfig::default())
    }

    /// Builds a runtime with explicit configuration.
    #[must_use]
    pub fn with_config(transport: T, env: E, config: DriverConfig) -> Self {
        Self {
            transport,
            scanner: FrameScanner::with_garbage_cap(config.garbage_buffer_limit),
            client: Client::with_config(env.clone(), config.client),
            env,
            tick_interval: config.tick_interval,
            state: ConnectionState::Disconnected,
        }
    }

    /// Current connection lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// A read-only view of the six-slot channel store.
    #[must_use]
    pub fn snapshot(&self) -> ChannelStoreSnapshot {
        self.client.snapshot()
    }

    /// Registers a subscriber for every action the command layer produces.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&mdp_client::ClientAction) + Send + 'static,
    ) -> mdp_client::SubscriptionId {
        self.client.subscribe(callback)
    }

    /// Submits a user command (or any other [`ClientEvent`]) to the
    /// command layer and executes whatever actions it returns. Lets a
    /// caller (a UI, a CLI, a test) drive the driver without going
    /// through the transport.
    pub async fn handle(&mut self, event: ClientEvent<E::Instant>) -> Result<(), RuntimeError> {
        let actions = self.client.handle(event)?;
        self.dispatch(actions).await
    }

    /// Runs the loop to completion: connects, then cycles until the
    /// transport closes or errors.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        self.connect().await?;
        while self.process_cycle().await? {}
        Ok(())
    }

    /// Runs exactly one cycle. Returns `Ok(false)` when the transport has
    /// closed and the loop should stop. Exposed so tests and alternative
    /// drivers (e.g. a TUI) can step the loop themselves.
    pub async fn process_cycle(&mut self) -> Result<bool, RuntimeError> {
        let read_outcome = tokio::select! {
            result = self.transport.read() => Some(result),
            () = self.env.sleep(self.tick_interval) => None,
        };

        match read_outcome {
            Some(Ok(Some(bytes))) => {
                for scan_event in self.scanner.feed(&bytes) {
                    match scan_event {
                        ScanEvent::Frame(frame) => self.dispatch_frame(frame).await?,
                        ScanEvent::Diagnostic(err) => {
                            tracing::debug!(error = %err, "frame scanner diagnostic");
                        }
                    }
                }
            }
            Some(Ok(None)) => {
                self.state = ConnectionState::Disconnected;
                let actions = self.client.handle(ClientEvent::Disconnected)?;
                self.dispatch(actions).await?;
                return Ok(false);
            }
            Some(Err(err)) => {
                self.state = ConnectionState::Error(err.to_string());
                return Err(err.into());
            }
            None => {}
        }

        let now = self.env.now();
        let actions = self.client.handle(ClientEvent::Tick { now })?;
        self.dispatch(actions).await?;

        Ok(true)
    }

    async fn dispatch_frame(&mut self, frame: RawFrame) -> Result<(), RuntimeError> {
        match Packet::decode(frame.type_tag, frame.channel, &frame.payload) {
            Ok(packet) => {
                if matches!(self.state, ConnectionState::Connecting) {
                    self.state = ConnectionState::Connected;
                }
                let actions = self.client.handle(ClientEvent::FrameReceived(packet))?;
                self.dispatch(actions).await?;
            }
            Err(err) => tracing::warn!(error = %err, "dropped undecodable frame"),
        }
        Ok(())
    }

    /// Marks the transport connecting and sends the initial GET_MACHINE
    /// probe. `run` calls this before its first cycle; exposed so callers
    /// that step cycles themselves (tests, alternative drivers) can too.
    pub async fn connect(&mut self) -> Result<(), RuntimeError> {
        self.state = ConnectionState::Connecting;
        let now = self.env.now();
        let actions = self.client.handle(ClientEvent::Connected { now })?;
        self.dispatch(actions).await
    }

    /// Executes every [`mdp_client::ClientAction::Send`] against the
    /// transport. A failed send to the output-toggle command is reported
    /// back to the command layer so the optimistic toggle reverts; any
    /// other action kind the command layer already published is left to
    /// the caller's own subscribers.
    async fn dispatch(&mut self, actions: Vec<mdp_client::ClientAction>) -> Result<(), RuntimeError> {
        let mut failures = Vec::new();
        for action in &actions {
            if let mdp_client::ClientAction::Send(frame) = action {
                if let Err(err) = self.write_frame(frame).await {
                    if frame.type_tag == PacketType::SetIsOutput.to_u8() {
                        failures.push(ClientEvent::ToggleSendFailed {
                            channel: frame.channel,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
        for event in failures {
            self.client.handle(event)?;
        }
        Ok(())
    }

    async fn write_frame(&mut self, frame: &RawFrame) -> Result<(), crate::error::TransportError> {
        let bytes = frame.to_bytes();
        match self.transport.write(&bytes).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, channel = frame.channel, "frame send failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdp_core::SimClock;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct MemoryTransport {
        inbound: VecDeque<Vec<u8>>,
        outbound: Vec<u8>,
    }

    impl Transport for MemoryTransport {
        async fn read(&mut self) -> Result<Option<Vec<u8>>, crate::error::TransportError> {
            Ok(self.inbound.pop_front())
        }

        async fn write(&mut self, bytes: &[u8]) -> Result<(), crate::error::TransportError> {
            self.outbound.extend_from_slice(bytes);
            Ok(())
        }

        async fn close(&mut self) {}
    }

    fn machine_reply_bytes() -> Vec<u8> {
        mdp_proto::RawFrame::broadcast(PacketType::Machine.to_u8(), bytes::Bytes::from_static(&[0, 0, 1]))
            .to_bytes()
            .to_vec()
    }

    #[tokio::test(start_paused = true)]
    async fn connect_sends_get_machine_before_any_cycle() {
        let transport = MemoryTransport::default();
        let mut runtime = Runtime::new(transport, SimClock);
        runtime.connect().await.unwrap();
        assert!(!runtime.transport.outbound.is_empty());
        assert_eq!(
            runtime.transport.outbound[2],
            PacketType::GetMachine.to_u8()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_decodes_frame_and_marks_connected() {
        let mut transport = MemoryTransport::default();
        transport.inbound.push_back(machine_reply_bytes());
        let mut runtime = Runtime::new(transport, SimClock);
        runtime.connect().await.unwrap();
        runtime.transport.outbound.clear();

        let continued = runtime.process_cycle().await.unwrap();
        assert!(continued);
        assert_eq!(*runtime.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_read_signals_disconnect_and_stops_loop() {
        let transport = MemoryTransport::default();
        let mut runtime = Runtime::new(transport, SimClock);
        runtime.connect().await.unwrap();
        let continued = runtime.process_cycle().await.unwrap();
        assert!(!continued);
        assert_eq!(*runtime.connection_state(), ConnectionState::Disconnected);
    }
}
