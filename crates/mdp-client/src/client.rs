//! Command layer: [`Client`] owns the channel store, the optimistic
//! output-toggle state machine, and the heartbeat schedule, and turns
//! [`ClientEvent`]s into [`ClientAction`]s.

use std::time::Duration;

use mdp_core::{ChannelStore, ChannelStoreSnapshot, Environment};
use mdp_proto::{Command, Packet, BROADCAST_CHANNEL};

use crate::bus::{EventBus, SubscriptionId};
use crate::error::CommandError;
use crate::event::{ClientAction, ClientEvent};
use crate::heartbeat::{HeartbeatSchedule, HEARTBEAT_INTERVAL};

/// 5 s optimistic-toggle acknowledge window (spec §4.5).
pub const TOGGLE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Per-channel output/input toggle state (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
enum ToggleState<I> {
    Idle,
    Pending {
        desired: bool,
        previous: bool,
        started_at: I,
    },
}

/// Timing and debounce knobs for [`Client`]. Defaults match spec.md's
/// literal constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientConfig {
    /// HEARTBEAT cadence while connected.
    pub heartbeat_interval: Duration,
    /// Optimistic output-toggle acknowledge window.
    pub toggle_timeout: Duration,
    /// Channel-switch debounce count (spec §4.3's "typically 3").
    pub channel_switch_debounce: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: HEARTBEAT_INTERVAL,
            toggle_timeout: TOGGLE_TIMEOUT,
            channel_switch_debounce: 3,
        }
    }
}

/// The command layer: channel store, optimistic toggles, heartbeat,
/// generic over [`Environment`] so production code uses the real clock and
/// tests drive a virtual one.
pub struct Client<E: Environment> {
    env: E,
    store: ChannelStore,
    bus: EventBus<ClientAction>,
    config: ClientConfig,
    toggles: [ToggleState<E::Instant>; 6],
    heartbeat: HeartbeatSchedule<E::Instant>,
    connected: bool,
}

impl<E: Environment> Client<E> {
    /// Builds a client with default timing.
    #[must_use]
    pub fn new(env: E) -> Self {
        Self::with_config(env, ClientConfig::default())
    }

    /// Builds a client with explicit timing, e.g. for tests that want a
    /// shorter toggle timeout.
    #[must_use]
    pub fn with_config(env: E, config: ClientConfig) -> Self {
        Self {
            heartbeat: HeartbeatSchedule::new(config.heartbeat_interval),
            env,
            store: ChannelStore::with_debounce(config.channel_switch_debounce),
            bus: EventBus::new(),
            toggles: std::array::from_fn(|_| ToggleState::Idle),
            connected: false,
            config,
        }
    }

    /// A read-only view of the six-slot channel store.
    #[must_use]
    pub fn snapshot(&self) -> ChannelStoreSnapshot {
        self.store.snapshot()
    }

    /// Registers a subscriber for every [`ClientAction`] produced by
    /// [`Self::handle`].
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&ClientAction) + Send + 'static,
    ) -> SubscriptionId {
        self.bus.subscribe(callback)
    }

    /// Cancels a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }

    /// Dispatches one event, returning the actions the caller must carry
    /// out. Every returned action is also published on the bus.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, CommandError> {
        match event {
            ClientEvent::FrameReceived(packet) => Ok(self.handle_frame(packet)),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::Connected { now } => Ok(self.handle_connected(now)),
            ClientEvent::Disconnected => Ok(self.handle_disconnected()),
            ClientEvent::SetActiveChannel { channel } => self.handle_set_active_channel(channel),
            ClientEvent::SetVoltage {
                channel,
                voltage_mv,
                current_ma,
            } => self.handle_set_point(channel, voltage_mv, current_ma, false),
            ClientEvent::SetCurrent {
                channel,
                voltage_mv,
                current_ma,
            } => self.handle_set_point(channel, voltage_mv, current_ma, true),
            ClientEvent::SetOutput { channel, enabled } => {
                self.handle_set_output(channel, enabled)
            }
            ClientEvent::SetAddress {
                channel,
                addr,
                freq_mhz,
            } => self.handle_set_address(channel, addr, freq_mhz),
            ClientEvent::SetAllAddresses { records } => Ok(self.handle_set_all_addresses(records)),
            ClientEvent::GetAddresses => Ok(self.broadcast(Command::GetAddr)),
            ClientEvent::GetMachine => Ok(self.broadcast(Command::GetMachine)),
            ClientEvent::StartAutoMatch => Ok(self.broadcast(Command::StartAutoMatch)),
            ClientEvent::StopAutoMatch => Ok(self.broadcast(Command::StopAutoMatch)),
            ClientEvent::ResetToDfu => Ok(self.broadcast(Command::ResetToDfu)),
            ClientEvent::Rgb { enabled } => Ok(self.broadcast(Command::Rgb { state: enabled })),
            ClientEvent::ToggleSendFailed { channel, reason } => {
                self.handle_toggle_send_failed(channel, reason)
            }
        }
    }

    fn validate_channel(channel: u8) -> Result<usize, CommandError> {
        let idx = usize::from(channel);
        if idx < 6 {
            Ok(idx)
        } else {
            Err(CommandError::InvalidChannel { channel })
        }
    }

    fn publish(&mut self, actions: Vec<ClientAction>) -> Vec<ClientAction> {
        for action in &actions {
            self.bus.publish(action);
        }
        actions
    }

    fn broadcast(&mut self, command: Command) -> Vec<ClientAction> {
        self.publish(vec![ClientAction::Send(command.encode(BROADCAST_CHANNEL))])
    }

    fn handle_frame(&mut self, packet: Packet) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        if let Packet::Synthesize { records, .. } = &packet {
            for (idx, record) in records.iter().enumerate() {
                if let ToggleState::Pending { desired, .. } = self.toggles[idx] {
                    if record.output_on == desired {
                        self.toggles[idx] = ToggleState::Idle;
                        actions.push(ClientAction::ToggleConfirmed {
                            channel: idx as u8,
                            state: desired,
                        });
                    }
                }
            }
        }
        for event in self.store.apply(&packet) {
            actions.push(ClientAction::Store(event));
        }
        self.publish(actions)
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        if self.connected && self.heartbeat.is_due(now) {
            self.heartbeat.mark_sent(now);
            actions.push(ClientAction::Send(
                Command::Heartbeat.encode(BROADCAST_CHANNEL),
            ));
        }
        for idx in 0..6 {
            if let ToggleState::Pending {
                previous,
                started_at,
                ..
            } = self.toggles[idx]
            {
                if now - started_at >= self.config.toggle_timeout {
                    self.store.set_output_optimistic(idx, previous);
                    self.toggles[idx] = ToggleState::Idle;
                    actions.push(ClientAction::ToggleTimedOut {
                        channel: idx as u8,
                        reverted_to: previous,
                    });
                }
            }
        }
        self.publish(actions)
    }

    fn handle_connected(&mut self, now: E::Instant) -> Vec<ClientAction> {
        self.connected = true;
        self.heartbeat.mark_sent(now);
        self.publish(vec![ClientAction::Send(
            Command::GetMachine.encode(BROADCAST_CHANNEL),
        )])
    }

    fn handle_disconnected(&mut self) -> Vec<ClientAction> {
        self.connected = false;
        self.toggles = std::array::from_fn(|_| ToggleState::Idle);
        self.publish(Vec::new())
    }

    fn handle_set_active_channel(
        &mut self,
        channel: u8,
    ) -> Result<Vec<ClientAction>, CommandError> {
        Self::validate_channel(channel)?;
        self.store.set_active_channel_optimistic(channel);
        Ok(self.publish(vec![ClientAction::Send(Command::SetCh.encode(channel))]))
    }

    fn handle_set_point(
        &mut self,
        channel: u8,
        voltage_mv: u16,
        current_ma: u16,
        current_emphasized: bool,
    ) -> Result<Vec<ClientAction>, CommandError> {
        let idx = Self::validate_channel(channel)?;
        self.store.stage_target(
            idx,
            f32::from(voltage_mv) / 1000.0,
            f32::from(current_ma) / 1000.0,
        );
        let command = if current_emphasized {
            Command::SetI {
                voltage_mv,
                current_ma,
            }
        } else {
            Command::SetV {
                voltage_mv,
                current_ma,
            }
        };
        Ok(self.publish(vec![ClientAction::Send(command.encode(channel))]))
    }

    fn handle_set_output(
        &mut self,
        channel: u8,
        enabled: bool,
    ) -> Result<Vec<ClientAction>, CommandError> {
        let idx = Self::validate_channel(channel)?;
        if matches!(self.toggles[idx], ToggleState::Pending { .. }) {
            return Ok(self.publish(Vec::new()));
        }
        let previous = self.store.snapshot().slots[idx].output_on;
        self.store.set_output_optimistic(idx, enabled);
        self.toggles[idx] = ToggleState::Pending {
            desired: enabled,
            previous,
            started_at: self.env.now(),
        };
        Ok(self.publish(vec![ClientAction::Send(
            Command::SetIsOutput { state: enabled }.encode(channel),
        )]))
    }

    fn handle_set_address(
        &mut self,
        channel: u8,
        addr: [u8; 5],
        freq_mhz: u16,
    ) -> Result<Vec<ClientAction>, CommandError> {
        Self::validate_channel(channel)?;
        let freq_offset = freq_mhz.saturating_sub(2400) as u8;
        Ok(self.publish(vec![ClientAction::Send(
            Command::SetAddr { addr, freq_offset }.encode(channel),
        )]))
    }

    fn handle_set_all_addresses(&mut self, records: [([u8; 5], u16); 6]) -> Vec<ClientAction> {
        let wire_records =
            records.map(|(addr, freq_mhz)| (addr, freq_mhz.saturating_sub(2400) as u8));
        self.publish(vec![ClientAction::Send(
            Command::SetAllAddr {
                records: wire_records,
            }
            .encode(BROADCAST_CHANNEL),
        )])
    }

    fn handle_toggle_send_failed(
        &mut self,
        channel: u8,
        reason: String,
    ) -> Result<Vec<ClientAction>, CommandError> {
        let idx = Self::validate_channel(channel)?;
        let ToggleState::Pending { previous, .. } = self.toggles[idx] else {
            return Err(CommandError::ToggleSendFailed { channel, reason });
        };
        self.store.set_output_optimistic(idx, previous);
        self.toggles[idx] = ToggleState::Idle;
        Ok(self.publish(vec![ClientAction::ToggleErrored {
            channel,
            reverted_to: previous,
        }]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdp_core::SimClock;
    use mdp_proto::{ChannelRecord, PacketType};

    fn blank_record(idx: u8, output_on: bool) -> ChannelRecord {
        ChannelRecord {
            num: idx,
            out_v_raw: 0,
            out_i_raw: 0,
            in_v_raw: 0,
            in_i_raw: 0,
            set_v_raw: 0,
            set_i_raw: 0,
            temp_raw: 250,
            online: true,
            machine_type: 0,
            lock: 0,
            status: 0,
            output_on,
            color_lo: 0,
            color_hi: 0,
            color_pad: 0,
            error: 0,
            end: 0,
        }
    }

    fn synth_packet(toggled_channel: usize, output_on: bool) -> Packet {
        let records =
            std::array::from_fn(|i| blank_record(i as u8, i == toggled_channel && output_on));
        Packet::Synthesize {
            channel: 0,
            records,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn set_output_enters_pending_then_confirms_on_matching_synthesize() {
        let mut client = Client::new(SimClock);

        let first = client
            .handle(ClientEvent::SetOutput {
                channel: 2,
                enabled: true,
            })
            .unwrap();
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0], ClientAction::Send(_)));

        let ignored = client
            .handle(ClientEvent::SetOutput {
                channel: 2,
                enabled: false,
            })
            .unwrap();
        assert!(ignored.is_empty());

        let confirmed = client
            .handle(ClientEvent::FrameReceived(synth_packet(2, true)))
            .unwrap();
        assert!(confirmed.iter().any(|a| matches!(
            a,
            ClientAction::ToggleConfirmed {
                channel: 2,
                state: true
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_times_out_and_reverts_after_five_seconds() {
        let mut client = Client::new(SimClock);
        client
            .handle(ClientEvent::SetOutput {
                channel: 0,
                enabled: true,
            })
            .unwrap();

        tokio::time::advance(Duration::from_millis(5000)).await;
        let actions = client
            .handle(ClientEvent::Tick {
                now: SimClock.now(),
            })
            .unwrap();
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::ToggleTimedOut {
                channel: 0,
                reverted_to: false
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_reverts_and_errors_pending_toggle() {
        let mut client = Client::new(SimClock);
        client
            .handle(ClientEvent::SetOutput {
                channel: 1,
                enabled: true,
            })
            .unwrap();

        let actions = client
            .handle(ClientEvent::ToggleSendFailed {
                channel: 1,
                reason: "port closed".to_string(),
            })
            .unwrap();
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::ToggleErrored {
                channel: 1,
                reverted_to: false
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_emits_get_machine_then_heartbeat_after_interval() {
        let mut client = Client::new(SimClock);

        let connect_actions = client
            .handle(ClientEvent::Connected {
                now: SimClock.now(),
            })
            .unwrap();
        assert!(connect_actions.iter().any(|a| matches!(
            a,
            ClientAction::Send(frame) if frame.type_tag == PacketType::GetMachine.to_u8()
        )));

        let too_soon = client
            .handle(ClientEvent::Tick {
                now: SimClock.now(),
            })
            .unwrap();
        assert!(too_soon.is_empty());

        tokio::time::advance(Duration::from_millis(1000)).await;
        let due = client
            .handle(ClientEvent::Tick {
                now: SimClock.now(),
            })
            .unwrap();
        assert!(due.iter().any(|a| matches!(
            a,
            ClientAction::Send(frame) if frame.type_tag == PacketType::Heartbeat.to_u8()
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_channel_is_rejected() {
        let mut client = Client::new(SimClock);
        let err = client
            .handle(ClientEvent::SetActiveChannel { channel: 6 })
            .unwrap_err();
        assert_eq!(err, CommandError::InvalidChannel { channel: 6 });
    }
}
