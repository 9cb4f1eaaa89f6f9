//! The six-slot channel store: spec §4.3's pure `handle(&mut self, event)`
//! state machine, grounded in the teacher's plain-struct `App`/`RoomState`
//! shape. No I/O; fully unit-testable.

use mdp_proto::{AddrRecord, ChannelRecord, MachineTypeTag, Packet, WaveGroup};

use crate::error::ValidationError;

/// Each raw WAVE timestamp unit is 0.1 ms (spec §9 open question, decided:
/// implement the literal prescription and expose the divisor so a
/// firmware-version-specific build can override it later).
pub const WAVE_TIMESTAMP_UNIT_US: u64 = 100;

/// Number of SYNTHESIZE packets a locally-initiated channel switch must
/// survive mismatching before the store reconciles to the device's report.
const CHANNEL_SWITCH_DEBOUNCE: u8 = 3;

/// Derived operating mode (spec §4.3 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No closed-loop regulation is indicated by status.
    #[default]
    Normal,
    /// Constant current.
    Cc,
    /// Constant voltage.
    Cv,
    /// Constant resistance (load only).
    Cr,
    /// Constant power (load only).
    Cp,
}

fn derive_mode(machine_type: MachineTypeTag, status: u8) -> Mode {
    match machine_type {
        MachineTypeTag::L1060 => match status {
            0 => Mode::Cc,
            1 => Mode::Cv,
            2 => Mode::Cr,
            3 => Mode::Cp,
            _ => Mode::Normal,
        },
        MachineTypeTag::P906 => match status {
            1 => Mode::Cc,
            2 => Mode::Cv,
            _ => Mode::Normal,
        },
        // P905's status byte is undefined by the source; treat as Normal.
        MachineTypeTag::Node | MachineTypeTag::P905 => Mode::Normal,
    }
}

/// An 8-bit RGB triple decoded from a slot's RGB565 color field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// Decodes an RGB565 `lo|hi` pair into 8-bit-per-channel RGB.
///
/// Matches spec §8 invariant 7's worked example exactly (`0xFFFF ->
/// (248, 252, 248)`), which is a plain left-shift expansion rather than the
/// bit-replicated expansion the surrounding prose describes; the literal
/// invariant is the binding contract here.
fn decode_rgb565(color_lo: u8, color_hi: u8) -> Rgb {
    let value = u16::from(color_lo) | (u16::from(color_hi) << 8);
    let r5 = (value >> 11) & 0x1F;
    let g6 = (value >> 5) & 0x3F;
    let b5 = value & 0x1F;
    Rgb {
        r: (r5 << 3) as u8,
        g: (g6 << 2) as u8,
        b: (b5 << 3) as u8,
    }
}

/// Head-unit type (spec §3 "Machine-type tag", head-unit row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadUnitType {
    /// Not yet announced by a MACHINE packet.
    #[default]
    NoType,
    /// M01, has an LCD.
    HaveLcd,
    /// M02, no LCD. Also the fallback for any unrecognized raw byte.
    NoLcd,
}

/// One ingested waveform sample, engineering units, absolute timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformSample {
    /// Milliseconds since this channel started recording.
    pub timestamp_ms: f64,
    /// Volts.
    pub voltage_v: f32,
    /// Amps.
    pub current_a: f32,
}

/// One of the six channel slots (spec §3 "Channel slot").
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelSlot {
    /// Slot index, 0..5.
    pub index: u8,
    /// Whether the most recent SYNTHESIZE marked this slot online.
    pub online: bool,
    /// Validated machine-type tag, once at least one valid SYNTHESIZE has
    /// been applied.
    pub machine_type: Option<MachineTypeTag>,
    /// Latest output voltage, volts.
    pub output_voltage_v: f32,
    /// Latest output current, amps.
    pub output_current_a: f32,
    /// `output_voltage_v * output_current_a`, recomputed on every update.
    pub output_power_w: f32,
    /// Latest input voltage, volts.
    pub input_voltage_v: f32,
    /// Latest input current, amps.
    pub input_current_a: f32,
    /// Device-reported set-point voltage, volts.
    pub set_voltage_v: f32,
    /// Device-reported set-point current, amps.
    pub set_current_a: f32,
    /// Host-staged target voltage, volts.
    pub target_voltage_v: f32,
    /// Host-staged target current, amps.
    pub target_current_a: f32,
    /// `target_voltage_v * target_current_a`.
    pub target_power_w: f32,
    /// Temperature, degrees Celsius.
    pub temperature_c: f32,
    /// Whether the slot's output (or input, for a load) is enabled.
    pub output_on: bool,
    /// Derived operating mode.
    pub mode: Mode,
    /// Decoded indicator color.
    pub color: Rgb,
    /// Device-reported error flag.
    pub error: u8,
    /// Canonical-order (reversed from wire) 5-byte address.
    pub address: [u8; 5],
    /// Absolute frequency, MHz.
    pub frequency_mhz: u16,
    /// `true` iff `address == [0, 0, 0, 0, 0]`.
    pub address_empty: bool,
    /// Gates WAVE sample ingestion for this slot.
    pub recording: bool,
    /// Ingested waveform samples, in arrival order.
    pub waveform: Vec<WaveformSample>,
    /// Running absolute-time accumulator, raw wire units, used to derive
    /// each ingested sample's timestamp.
    waveform_clock_raw: u64,
}

/// A plain-data, `Clone` copy of the store's full observable state, so a
/// caller never holds a borrow across an await point.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStoreSnapshot {
    /// All six slots, in index order.
    pub slots: [ChannelSlot; 6],
    /// Currently focused channel.
    pub now_ch: u8,
    /// `true` until the first SYNTHESIZE has been applied.
    pub waiting_synthesize: bool,
    /// Head-unit machine type.
    pub head_unit_type: HeadUnitType,
}

/// A notification describing what changed as a result of applying a
/// decoded packet. Distinct from the raw packet itself, which the runtime
/// forwards to event-bus subscribers unconditionally; these are the
/// store's derived state-transition events.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A slot transitioned online/offline.
    OnlineChanged {
        /// Slot index.
        channel: u8,
        /// New online state.
        online: bool,
    },
    /// The focused channel changed (debounce settled, or a device-driven
    /// UPDAT_CH).
    ActiveChannelChanged {
        /// The newly focused channel.
        channel: u8,
    },
    /// The head-unit machine type changed.
    MachineTypeChanged {
        /// The new head-unit type.
        head_unit_type: HeadUnitType,
    },
    /// An ERR_240 notification arrived.
    Error240,
    /// A SYNTHESIZE record failed range validation; the slot was forced
    /// offline.
    ValidationFailed(ValidationError),
}

fn validate_record(
    channel: u8,
    out_v: f32,
    out_i: f32,
    in_v: f32,
    in_i: f32,
    temperature_c: f32,
    machine_type_raw: u8,
) -> Result<MachineTypeTag, ValidationError> {
    if !(0.0..=50.0).contains(&out_v) {
        return Err(ValidationError::VoltageOutOfRange {
            channel,
            volts: out_v,
        });
    }
    if !(0.0..=50.0).contains(&in_v) {
        return Err(ValidationError::VoltageOutOfRange {
            channel,
            volts: in_v,
        });
    }
    if !(0.0..=10.0).contains(&out_i) {
        return Err(ValidationError::CurrentOutOfRange {
            channel,
            amps: out_i,
        });
    }
    if !(0.0..=10.0).contains(&in_i) {
        return Err(ValidationError::CurrentOutOfRange { channel, amps: in_i });
    }
    if !(-10.0..=85.0).contains(&temperature_c) {
        return Err(ValidationError::TemperatureOutOfRange {
            channel,
            celsius: temperature_c,
        });
    }
    MachineTypeTag::from_u8(machine_type_raw).ok_or(ValidationError::UnknownMachineType {
        channel,
        raw: machine_type_raw,
    })
}

/// Owns the six channel slots and the protocol's global state
/// (`now_ch`, `change_channel_count`, `waiting_synthesize`,
/// `head_unit_type`). Pure data mutation; no I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStore {
    slots: [ChannelSlot; 6],
    now_ch: u8,
    change_channel_count: u8,
    debounce: u8,
    waiting_synthesize: bool,
    head_unit_type: HeadUnitType,
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelStore {
    /// Creates a store with all six slots freshly initialized and
    /// `waiting_synthesize` set, using the default debounce count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_debounce(CHANNEL_SWITCH_DEBOUNCE)
    }

    /// Creates a store with a caller-chosen channel-switch debounce count
    /// (spec §4.3's "typically 3").
    #[must_use]
    pub fn with_debounce(debounce: u8) -> Self {
        let slots = std::array::from_fn(|i| ChannelSlot {
            index: i as u8,
            ..ChannelSlot::default()
        });
        Self {
            slots,
            now_ch: 0,
            change_channel_count: 0,
            debounce,
            waiting_synthesize: true,
            head_unit_type: HeadUnitType::NoType,
        }
    }

    /// A `Clone` copy of the full observable state.
    #[must_use]
    pub fn snapshot(&self) -> ChannelStoreSnapshot {
        ChannelStoreSnapshot {
            slots: self.slots.clone(),
            now_ch: self.now_ch,
            waiting_synthesize: self.waiting_synthesize,
            head_unit_type: self.head_unit_type,
        }
    }

    /// Applies one decoded packet, mutating state and returning the
    /// derived events that resulted.
    pub fn apply(&mut self, packet: &Packet) -> Vec<StoreEvent> {
        match packet {
            Packet::Synthesize { channel, records } => self.apply_synthesize(*channel, records),
            Packet::Wave {
                channel,
                samples_per_group,
                groups,
            } => self.apply_wave(*channel, *samples_per_group, groups),
            Packet::Addr { records, .. } => self.apply_addr(records),
            Packet::UpdatCh { target_channel, .. } => self.apply_updat_ch(*target_channel),
            Packet::Machine { machine_type, .. } => self.apply_machine(*machine_type),
            Packet::Err240 => self.apply_err240(),
        }
    }

    fn apply_synthesize(&mut self, header_channel: u8, records: &[ChannelRecord; 6]) -> Vec<StoreEvent> {
        let mut events = Vec::new();

        for (i, rec) in records.iter().enumerate() {
            let out_v = f32::from(rec.out_v_raw) / 1000.0;
            let out_i = f32::from(rec.out_i_raw) / 1000.0;
            let in_v = f32::from(rec.in_v_raw) / 1000.0;
            let in_i = f32::from(rec.in_i_raw) / 1000.0;
            let set_v = f32::from(rec.set_v_raw) / 1000.0;
            let set_i = f32::from(rec.set_i_raw) / 1000.0;
            let temperature_c = f32::from(rec.temp_raw) / 10.0;

            let slot = &mut self.slots[i];
            let was_online = slot.online;

            match validate_record(i as u8, out_v, out_i, in_v, in_i, temperature_c, rec.machine_type) {
                Ok(machine_type) => {
                    slot.online = rec.online;
                    slot.machine_type = Some(machine_type);
                    slot.output_voltage_v = out_v;
                    slot.output_current_a = out_i;
                    slot.output_power_w = out_v * out_i;
                    slot.input_voltage_v = in_v;
                    slot.input_current_a = in_i;
                    slot.set_voltage_v = set_v;
                    slot.set_current_a = set_i;
                    slot.temperature_c = temperature_c;
                    slot.output_on = rec.output_on;
                    slot.mode = derive_mode(machine_type, rec.status);
                    slot.color = decode_rgb565(rec.color_lo, rec.color_hi);
                    slot.error = rec.error;
                }
                Err(validation_error) => {
                    slot.online = false;
                    slot.output_voltage_v = 0.0;
                    slot.output_current_a = 0.0;
                    slot.output_power_w = 0.0;
                    slot.input_voltage_v = 0.0;
                    slot.input_current_a = 0.0;
                    events.push(StoreEvent::ValidationFailed(validation_error));
                }
            }

            if was_online != slot.online {
                events.push(StoreEvent::OnlineChanged {
                    channel: i as u8,
                    online: slot.online,
                });
            }
        }

        self.waiting_synthesize = false;

        if header_channel != self.now_ch {
            self.change_channel_count = self.change_channel_count.saturating_sub(1);
            if self.change_channel_count == 0 {
                self.now_ch = header_channel;
                events.push(StoreEvent::ActiveChannelChanged {
                    channel: header_channel,
                });
            }
        }

        events
    }

    fn apply_wave(&mut self, channel: u8, samples_per_group: u8, groups: &[WaveGroup]) -> Vec<StoreEvent> {
        if self.waiting_synthesize {
            return Vec::new();
        }
        let Some(slot) = self.slots.get_mut(usize::from(channel)) else {
            return Vec::new();
        };
        if !slot.recording {
            return Vec::new();
        }
        let divisor = u64::from(samples_per_group).max(1);
        for group in groups {
            let sub_interval = u64::from(group.timestamp_raw) / divisor;
            for &(voltage_raw, current_raw) in &group.samples {
                slot.waveform_clock_raw += sub_interval;
                slot.waveform.push(WaveformSample {
                    timestamp_ms: slot.waveform_clock_raw as f64 * (WAVE_TIMESTAMP_UNIT_US as f64 / 1000.0),
                    voltage_v: f32::from(voltage_raw) / 1000.0,
                    current_a: f32::from(current_raw) / 1000.0,
                });
            }
        }
        Vec::new()
    }

    fn apply_addr(&mut self, records: &[AddrRecord; 6]) -> Vec<StoreEvent> {
        for (i, rec) in records.iter().enumerate() {
            let mut addr = rec.addr_wire;
            addr.reverse();
            let slot = &mut self.slots[i];
            slot.address_empty = addr == [0u8; 5];
            slot.address = addr;
            slot.frequency_mhz = 2400 + u16::from(rec.freq_offset);
        }
        Vec::new()
    }

    fn apply_updat_ch(&mut self, target_channel: u8) -> Vec<StoreEvent> {
        self.now_ch = target_channel;
        vec![StoreEvent::ActiveChannelChanged {
            channel: target_channel,
        }]
    }

    fn apply_machine(&mut self, machine_type_raw: u8) -> Vec<StoreEvent> {
        self.head_unit_type = if machine_type_raw == 0x10 {
            HeadUnitType::HaveLcd
        } else {
            HeadUnitType::NoLcd
        };
        vec![StoreEvent::MachineTypeChanged {
            head_unit_type: self.head_unit_type,
        }]
    }

    fn apply_err240(&mut self) -> Vec<StoreEvent> {
        vec![StoreEvent::Error240]
    }

    /// Optimistically sets the focused channel and primes the debounce
    /// counter; called by the command layer alongside sending SET_CH.
    pub fn set_active_channel_optimistic(&mut self, channel: u8) {
        self.now_ch = channel;
        self.change_channel_count = self.debounce;
    }

    /// Stages a target voltage/current for `channel` (set_voltage/
    /// set_current's data-side half; the command layer also encodes and
    /// sends SET_V/SET_I).
    pub fn stage_target(&mut self, channel: usize, voltage_v: f32, current_a: f32) {
        let slot = &mut self.slots[channel];
        slot.target_voltage_v = voltage_v;
        slot.target_current_a = current_a;
        slot.target_power_w = voltage_v * current_a;
    }

    /// Optimistically sets the displayed output/input-enable state. Used by
    /// the optimistic-toggle state machine in the command layer.
    pub fn set_output_optimistic(&mut self, channel: usize, state: bool) {
        self.slots[channel].output_on = state;
    }

    /// Starts gating WAVE ingestion for `channel`.
    pub fn start_recording(&mut self, channel: usize) {
        self.slots[channel].recording = true;
    }

    /// Stops gating WAVE ingestion for `channel`.
    pub fn stop_recording(&mut self, channel: usize) {
        self.slots[channel].recording = false;
    }

    /// Clears `channel`'s accumulated waveform buffer.
    pub fn clear_recording(&mut self, channel: usize) {
        self.slots[channel].waveform.clear();
        self.slots[channel].waveform_clock_raw = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdp_proto::{AddrRecord, ChannelRecord, WaveGroup};

    fn blank_record(num: u8) -> ChannelRecord {
        ChannelRecord {
            num,
            out_v_raw: 0,
            out_i_raw: 0,
            in_v_raw: 0,
            in_i_raw: 0,
            set_v_raw: 0,
            set_i_raw: 0,
            temp_raw: 0,
            online: false,
            machine_type: 0,
            lock: 0,
            status: 0,
            output_on: false,
            color_lo: 0,
            color_hi: 0,
            color_pad: 0,
            error: 0,
            end: 0,
        }
    }

    #[test]
    fn s3_synthesize_parse_matches_literal_example() {
        let mut records = std::array::from_fn(|i| blank_record(i as u8));
        records[0] = ChannelRecord {
            out_v_raw: 3600,
            out_i_raw: 1000,
            temp_raw: 281,
            online: true,
            machine_type: 2,
            status: 1,
            output_on: true,
            ..blank_record(0)
        };

        let mut store = ChannelStore::new();
        store.apply(&Packet::Synthesize { channel: 0, records });
        let snapshot = store.snapshot();
        let slot0 = &snapshot.slots[0];

        assert!((slot0.output_voltage_v - 3.6).abs() < f32::EPSILON);
        assert!((slot0.output_current_a - 1.0).abs() < f32::EPSILON);
        assert!((slot0.output_power_w - 3.6).abs() < 1e-5);
        assert!((slot0.temperature_c - 28.1).abs() < 1e-4);
        assert!(slot0.online);
        assert_eq!(slot0.mode, Mode::Cc);
        assert!(slot0.output_on);
        assert_eq!(slot0.machine_type, Some(MachineTypeTag::P906));
    }

    #[test]
    fn invariant_4_power_matches_voltage_times_current() {
        let mut records = std::array::from_fn(|i| blank_record(i as u8));
        records[2] = ChannelRecord {
            out_v_raw: 12000,
            out_i_raw: 2500,
            ..blank_record(2)
        };
        let mut store = ChannelStore::new();
        store.apply(&Packet::Synthesize { channel: 0, records });
        let slot = &store.snapshot().slots[2];
        assert!((slot.output_power_w - slot.output_voltage_v * slot.output_current_a).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_voltage_forces_offline_and_preserves_target() {
        let mut store = ChannelStore::new();
        store.stage_target(1, 5.0, 1.0);
        let mut records = std::array::from_fn(|i| blank_record(i as u8));
        records[1] = ChannelRecord {
            out_v_raw: 60_000, // 60 V, out of [0, 50]
            online: true,
            ..blank_record(1)
        };
        let events = store.apply(&Packet::Synthesize { channel: 0, records });
        let slot = &store.snapshot().slots[1];
        assert!(!slot.online);
        assert!((slot.target_voltage_v - 5.0).abs() < f32::EPSILON);
        assert!(events
            .iter()
            .any(|e| matches!(e, StoreEvent::ValidationFailed(ValidationError::VoltageOutOfRange { .. }))));
    }

    #[test]
    fn s7_rgb565_round_trip_invariant() {
        assert_eq!(decode_rgb565(0xFF, 0xFF), Rgb { r: 248, g: 252, b: 248 });
        assert_eq!(decode_rgb565(0x00, 0x00), Rgb { r: 0, g: 0, b: 0 });
    }

    #[test]
    fn s8_addr_wire_order_reversal() {
        let mut records = std::array::from_fn(|_| AddrRecord {
            addr_wire: [0; 5],
            freq_offset: 0,
        });
        records[0] = AddrRecord {
            addr_wire: [0x05, 0x04, 0x03, 0x02, 0x01],
            freq_offset: 20,
        };
        let mut store = ChannelStore::new();
        store.apply(&Packet::Addr { channel: 0, records });
        let slot = &store.snapshot().slots[0];
        assert_eq!(slot.address, [0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(slot.frequency_mhz, 2420);
        assert!(!slot.address_empty);
    }

    #[test]
    fn invariant_5_address_empty_iff_all_zero() {
        let records = std::array::from_fn(|_| AddrRecord {
            addr_wire: [0; 5],
            freq_offset: 0,
        });
        let mut store = ChannelStore::new();
        store.apply(&Packet::Addr { channel: 0, records });
        assert!(store.snapshot().slots[0].address_empty);
    }

    fn synthesize_channel_zero() -> Packet {
        let records = std::array::from_fn(|i| blank_record(i as u8));
        Packet::Synthesize { channel: 0, records }
    }

    fn wave_two_samples_per_group() -> Packet {
        let groups = (0..10)
            .map(|_| WaveGroup {
                timestamp_raw: 10,
                samples: vec![(100, 50), (100, 50)],
            })
            .collect();
        Packet::Wave {
            channel: 0,
            samples_per_group: 2,
            groups,
        }
    }

    #[test]
    fn s9_wave_dropped_before_synthesize_and_ingested_after_recording() {
        let mut store = ChannelStore::new();

        // Before any SYNTHESIZE: waiting_synthesize gates ingestion.
        store.start_recording(0);
        store.apply(&wave_two_samples_per_group());
        assert!(store.snapshot().slots[0].waveform.is_empty());

        // After SYNTHESIZE and with recording on: samples ingest.
        store.apply(&synthesize_channel_zero());
        store.apply(&wave_two_samples_per_group());
        assert_eq!(store.snapshot().slots[0].waveform.len(), 20);
    }

    #[test]
    fn wave_dropped_when_not_recording() {
        let mut store = ChannelStore::new();
        store.apply(&synthesize_channel_zero());
        store.apply(&wave_two_samples_per_group());
        assert!(store.snapshot().slots[0].waveform.is_empty());
    }

    #[test]
    fn channel_switch_debounce_requires_repeated_mismatch_before_adopting() {
        let mut store = ChannelStore::new();
        store.apply(&synthesize_channel_zero());
        store.set_active_channel_optimistic(3);
        assert_eq!(store.snapshot().now_ch, 3);

        // Two mismatched SYNTHESIZE packets (still channel 0 on the wire)
        // should not revert the optimistic value yet.
        store.apply(&synthesize_channel_zero());
        store.apply(&synthesize_channel_zero());
        assert_eq!(store.snapshot().now_ch, 3);

        // The third mismatch exhausts the debounce window and reconciles
        // to the device's report.
        store.apply(&synthesize_channel_zero());
        assert_eq!(store.snapshot().now_ch, 0);
    }

    #[test]
    fn updat_ch_switches_focus_without_debounce() {
        let mut store = ChannelStore::new();
        store.apply(&Packet::UpdatCh {
            channel: 0,
            target_channel: 4,
        });
        assert_eq!(store.snapshot().now_ch, 4);
    }

    #[test]
    fn machine_packet_sets_head_unit_type() {
        let mut store = ChannelStore::new();
        store.apply(&Packet::Machine {
            channel: 0,
            machine_type: 0x10,
        });
        assert_eq!(store.snapshot().head_unit_type, HeadUnitType::HaveLcd);

        store.apply(&Packet::Machine {
            channel: 0,
            machine_type: 0x11,
        });
        assert_eq!(store.snapshot().head_unit_type, HeadUnitType::NoLcd);
    }
}
