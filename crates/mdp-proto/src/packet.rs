//! Tagged packet codec: decodes a [`RawFrame`] into a [`Packet`] variant
//! with strongly typed (but still wire-unit) fields, and encodes outbound
//! [`Command`]s back into frames.

use bytes::Bytes;

use crate::errors::DecodeError;
use crate::frame::RawFrame;

/// The packet type registry (spec §3). Applies to both inbound packets and
/// outbound commands; a given tag is only ever used in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Periodic aggregate telemetry for all six slots.
    Synthesize,
    /// Streaming voltage/current samples for the focused channel.
    Wave,
    /// Address/frequency metadata for all six slots.
    Addr,
    /// Device-driven notification that the focused channel changed.
    UpdatCh,
    /// Head-unit machine-type (M01/M02) announcement.
    Machine,
    /// Output (or input, for a load) enable/disable.
    SetIsOutput,
    /// Request the current address table.
    GetAddr,
    /// Program one slot's address and frequency offset.
    SetAddr,
    /// Select the focused channel.
    SetCh,
    /// Stage a voltage/current set-point, voltage-emphasized.
    SetV,
    /// Stage a voltage/current set-point, current-emphasized.
    SetI,
    /// Program all six slots' addresses and frequency offsets at once.
    SetAllAddr,
    /// Begin the device-side auto-match procedure.
    StartAutoMatch,
    /// Cancel the device-side auto-match procedure.
    StopAutoMatch,
    /// Enter device firmware update mode.
    ResetToDfu,
    /// Toggle head-unit RGB indicator state.
    Rgb,
    /// Request the head-unit machine-type announcement.
    GetMachine,
    /// Periodic liveness probe.
    Heartbeat,
    /// Empty notification packet.
    Err240,
}

impl PacketType {
    /// The wire tag for this packet type.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Synthesize => 0x11,
            Self::Wave => 0x12,
            Self::Addr => 0x13,
            Self::UpdatCh => 0x14,
            Self::Machine => 0x15,
            Self::SetIsOutput => 0x16,
            Self::GetAddr => 0x17,
            Self::SetAddr => 0x18,
            Self::SetCh => 0x19,
            Self::SetV => 0x1A,
            Self::SetI => 0x1B,
            Self::SetAllAddr => 0x1C,
            Self::StartAutoMatch => 0x1D,
            Self::StopAutoMatch => 0x1E,
            Self::ResetToDfu => 0x1F,
            Self::Rgb => 0x20,
            Self::GetMachine => 0x21,
            Self::Heartbeat => 0x22,
            Self::Err240 => 0x23,
        }
    }

    /// Looks up the packet type for a wire tag, if recognized.
    #[must_use]
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0x11 => Self::Synthesize,
            0x12 => Self::Wave,
            0x13 => Self::Addr,
            0x14 => Self::UpdatCh,
            0x15 => Self::Machine,
            0x16 => Self::SetIsOutput,
            0x17 => Self::GetAddr,
            0x18 => Self::SetAddr,
            0x19 => Self::SetCh,
            0x1A => Self::SetV,
            0x1B => Self::SetI,
            0x1C => Self::SetAllAddr,
            0x1D => Self::StartAutoMatch,
            0x1E => Self::StopAutoMatch,
            0x1F => Self::ResetToDfu,
            0x20 => Self::Rgb,
            0x21 => Self::GetMachine,
            0x22 => Self::Heartbeat,
            0x23 => Self::Err240,
            _ => return None,
        })
    }
}

/// Per-slot module type (spec §3 "Machine-type tag").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineTypeTag {
    /// Passive node, no measurement capability.
    Node,
    /// P905 bench power supply.
    P905,
    /// P906 bench power supply.
    P906,
    /// L1060 electronic load.
    L1060,
}

impl MachineTypeTag {
    /// Looks up the slot machine type for a raw wire byte.
    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Node,
            1 => Self::P905,
            2 => Self::P906,
            3 => Self::L1060,
            _ => return None,
        })
    }
}

fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// One of the six 25-byte channel records carried by a SYNTHESIZE packet.
///
/// Every numeric field is still in wire units (millivolts, milliamps,
/// tenths of a degree); [`mdp_core`](../mdp_core/index.html) converts to
/// engineering units and applies range validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Slot index, 0..5.
    pub num: u8,
    /// Output voltage, millivolts.
    pub out_v_raw: u16,
    /// Output current, milliamps.
    pub out_i_raw: u16,
    /// Input voltage, millivolts.
    pub in_v_raw: u16,
    /// Input current, milliamps.
    pub in_i_raw: u16,
    /// Device-reported set-point voltage, millivolts.
    pub set_v_raw: u16,
    /// Device-reported set-point current, milliamps.
    pub set_i_raw: u16,
    /// Temperature, tenths of a degree Celsius.
    pub temp_raw: u16,
    /// Whether the slot is currently populated and reporting.
    pub online: bool,
    /// Raw machine-type tag; validated against [`MachineTypeTag`] upstream.
    pub machine_type: u8,
    /// Device lock-state byte (opaque at this layer).
    pub lock: u8,
    /// Mode/status byte; interpretation depends on `machine_type`.
    pub status: u8,
    /// Whether the slot's output (or input, for a load) is enabled.
    pub output_on: bool,
    /// RGB565 low byte.
    pub color_lo: u8,
    /// RGB565 high byte.
    pub color_hi: u8,
    /// Reserved padding byte.
    pub color_pad: u8,
    /// Device-reported error flag.
    pub error: u8,
    /// Record terminator byte (opaque at this layer).
    pub end: u8,
}

const CHANNEL_RECORD_LEN: usize = 25;

fn decode_channel_record(bytes: &[u8]) -> ChannelRecord {
    ChannelRecord {
        num: bytes[0],
        out_v_raw: read_u16_le(bytes, 1),
        out_i_raw: read_u16_le(bytes, 3),
        in_v_raw: read_u16_le(bytes, 5),
        in_i_raw: read_u16_le(bytes, 7),
        set_v_raw: read_u16_le(bytes, 9),
        set_i_raw: read_u16_le(bytes, 11),
        temp_raw: read_u16_le(bytes, 13),
        online: bytes[15] != 0,
        machine_type: bytes[16],
        lock: bytes[17],
        status: bytes[18],
        output_on: bytes[19] != 0,
        color_lo: bytes[20],
        color_hi: bytes[21],
        color_pad: bytes[22],
        error: bytes[23],
        end: bytes[24],
    }
}

/// One sample-group timestamp plus its voltage/current pairs, still in raw
/// wire units, from a WAVE packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveGroup {
    /// Elapsed time since the previous group, in units of 0.1 ms.
    pub timestamp_raw: u32,
    /// `(voltage_raw, current_raw)` pairs, 2 or 4 entries.
    pub samples: Vec<(u16, u16)>,
}

/// One of the six 6-byte address records carried by an ADDR packet, in
/// wire order (not yet reversed into canonical order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrRecord {
    /// Address bytes exactly as they appeared on the wire.
    pub addr_wire: [u8; 5],
    /// `frequency_mhz - 2400`.
    pub freq_offset: u8,
}

/// A decoded inbound packet with strongly typed, still-wire-unit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Aggregate telemetry for all six slots.
    Synthesize {
        /// Header `channel` byte (the currently focused channel).
        channel: u8,
        /// One record per slot, in slot order.
        records: [ChannelRecord; 6],
    },
    /// Streaming samples for the focused channel.
    Wave {
        /// Payload-embedded channel byte.
        channel: u8,
        /// 2 or 4, derived from the payload length.
        samples_per_group: u8,
        /// 10 sample groups.
        groups: Vec<WaveGroup>,
    },
    /// Address/frequency metadata for all six slots.
    Addr {
        /// Payload-embedded channel byte.
        channel: u8,
        /// One record per slot, in slot order, wire-ordered.
        records: [AddrRecord; 6],
    },
    /// Device-driven focused-channel change.
    UpdatCh {
        /// Payload-embedded channel byte (unused by the handler, kept for
        /// completeness).
        channel: u8,
        /// The new focused channel.
        target_channel: u8,
    },
    /// Head-unit machine-type announcement.
    Machine {
        /// Payload-embedded channel byte (unused by the handler).
        channel: u8,
        /// Raw machine-type byte (`0x10` = M01/haveLcd, else M02/noLcd).
        machine_type: u8,
    },
    /// Empty error notification.
    Err240,
}

/// Computes `samples_per_group` from a WAVE payload length, per the
/// `channel(u8) dummy(u8) + 10 * (timestamp(u32le) + n*(v u16le, i u16le))`
/// layout spec §4.2 describes. Returns `None` if the length does not fit
/// that shape for `n == 2` or `n == 4`.
fn wave_samples_per_group(payload_len: usize) -> Option<usize> {
    let groups_bytes = payload_len.checked_sub(2)?;
    if groups_bytes % 10 != 0 {
        return None;
    }
    let per_group = groups_bytes / 10;
    let sample_bytes = per_group.checked_sub(4)?;
    if sample_bytes % 4 != 0 {
        return None;
    }
    let n = sample_bytes / 4;
    (n == 2 || n == 4).then_some(n)
}

/// The two valid WAVE payload lengths, used only to fill in a diagnostic
/// `expected` value when a payload doesn't fit either shape.
const WAVE_PAYLOAD_LENS: [usize; 2] = [122, 202];

impl Packet {
    /// Decodes `payload` according to `type_tag`, using `channel` from the
    /// frame header where the packet type doesn't embed its own.
    pub fn decode(type_tag: u8, channel: u8, payload: &[u8]) -> Result<Self, DecodeError> {
        match type_tag {
            0x11 => decode_synthesize(channel, payload),
            0x12 => decode_wave(payload),
            0x13 => decode_addr(payload),
            0x14 => decode_updat_ch(payload),
            0x15 => decode_machine(payload),
            0x23 => decode_err240(payload),
            other => Err(DecodeError::UnknownType { type_tag: other }),
        }
    }
}

fn decode_synthesize(channel: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
    const EXPECTED: usize = CHANNEL_RECORD_LEN * 6;
    if payload.len() != EXPECTED {
        return Err(DecodeError::PayloadLengthMismatch {
            type_tag: PacketType::Synthesize.to_u8(),
            expected: EXPECTED,
            actual: payload.len(),
        });
    }
    let records = std::array::from_fn(|i| {
        let start = i * CHANNEL_RECORD_LEN;
        decode_channel_record(&payload[start..start + CHANNEL_RECORD_LEN])
    });
    Ok(Packet::Synthesize { channel, records })
}

fn decode_wave(payload: &[u8]) -> Result<Packet, DecodeError> {
    if payload.len() < 2 {
        return Err(DecodeError::PayloadTooShort {
            type_tag: PacketType::Wave.to_u8(),
            expected: 2,
            actual: payload.len(),
        });
    }
    let Some(samples_per_group) = wave_samples_per_group(payload.len()) else {
        let expected = *WAVE_PAYLOAD_LENS
            .iter()
            .min_by_key(|len| len.abs_diff(payload.len()))
            .unwrap_or(&WAVE_PAYLOAD_LENS[0]);
        return Err(DecodeError::PayloadLengthMismatch {
            type_tag: PacketType::Wave.to_u8(),
            expected,
            actual: payload.len(),
        });
    };
    let channel = payload[0];
    let mut groups = Vec::with_capacity(10);
    let mut offset = 2usize;
    for _ in 0..10 {
        let timestamp_raw = read_u32_le(payload, offset);
        offset += 4;
        let mut samples = Vec::with_capacity(samples_per_group);
        for _ in 0..samples_per_group {
            let voltage_raw = read_u16_le(payload, offset);
            let current_raw = read_u16_le(payload, offset + 2);
            samples.push((voltage_raw, current_raw));
            offset += 4;
        }
        groups.push(WaveGroup {
            timestamp_raw,
            samples,
        });
    }
    Ok(Packet::Wave {
        channel,
        samples_per_group: samples_per_group as u8,
        groups,
    })
}

fn decode_addr(payload: &[u8]) -> Result<Packet, DecodeError> {
    const RECORD_LEN: usize = 6;
    const EXPECTED: usize = 2 + RECORD_LEN * 6;
    if payload.len() != EXPECTED {
        return Err(DecodeError::PayloadLengthMismatch {
            type_tag: PacketType::Addr.to_u8(),
            expected: EXPECTED,
            actual: payload.len(),
        });
    }
    let channel = payload[0];
    let records = std::array::from_fn(|i| {
        let start = 2 + i * RECORD_LEN;
        let mut addr_wire = [0u8; 5];
        addr_wire.copy_from_slice(&payload[start..start + 5]);
        AddrRecord {
            addr_wire,
            freq_offset: payload[start + 5],
        }
    });
    Ok(Packet::Addr { channel, records })
}

fn decode_updat_ch(payload: &[u8]) -> Result<Packet, DecodeError> {
    const EXPECTED: usize = 3;
    if payload.len() != EXPECTED {
        return Err(DecodeError::PayloadLengthMismatch {
            type_tag: PacketType::UpdatCh.to_u8(),
            expected: EXPECTED,
            actual: payload.len(),
        });
    }
    Ok(Packet::UpdatCh {
        channel: payload[0],
        target_channel: payload[2],
    })
}

fn decode_machine(payload: &[u8]) -> Result<Packet, DecodeError> {
    const EXPECTED: usize = 3;
    if payload.len() != EXPECTED {
        return Err(DecodeError::PayloadLengthMismatch {
            type_tag: PacketType::Machine.to_u8(),
            expected: EXPECTED,
            actual: payload.len(),
        });
    }
    Ok(Packet::Machine {
        channel: payload[0],
        machine_type: payload[2],
    })
}

fn decode_err240(payload: &[u8]) -> Result<Packet, DecodeError> {
    if !payload.is_empty() {
        return Err(DecodeError::PayloadLengthMismatch {
            type_tag: PacketType::Err240.to_u8(),
            expected: 0,
            actual: payload.len(),
        });
    }
    Ok(Packet::Err240)
}

/// An outbound command, ready to be encoded into a frame and written to
/// the transport. Carries no channel: the caller supplies it at
/// [`Command::encode`] time, since the same command shape may target a
/// specific slot or the broadcast sentinel depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Periodic liveness probe; empty payload.
    Heartbeat,
    /// Stage a voltage/current set-point (voltage-emphasized encoding).
    SetV {
        /// Millivolts.
        voltage_mv: u16,
        /// Milliamps.
        current_ma: u16,
    },
    /// Stage a voltage/current set-point (current-emphasized encoding).
    SetI {
        /// Millivolts.
        voltage_mv: u16,
        /// Milliamps.
        current_ma: u16,
    },
    /// Enable or disable the slot's output (or input, for a load).
    SetIsOutput {
        /// `true` to enable.
        state: bool,
    },
    /// Select the focused channel (selector carried in the frame header).
    SetCh,
    /// Program one slot's address and frequency offset.
    SetAddr {
        /// Canonical-order address bytes.
        addr: [u8; 5],
        /// `frequency_mhz - 2400`.
        freq_offset: u8,
    },
    /// Program all six slots' addresses and frequency offsets.
    SetAllAddr {
        /// Six `(addr, freq_offset)` pairs, in slot order.
        records: [([u8; 5], u8); 6],
    },
    /// Toggle the head-unit RGB indicator.
    Rgb {
        /// `true` to enable.
        state: bool,
    },
    /// Request the current address table.
    GetAddr,
    /// Request the head-unit machine-type announcement.
    GetMachine,
    /// Enter device firmware update mode.
    ResetToDfu,
    /// Begin the device-side auto-match procedure.
    StartAutoMatch,
    /// Cancel the device-side auto-match procedure.
    StopAutoMatch,
}

impl Command {
    /// The wire type tag this command encodes to.
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Heartbeat => PacketType::Heartbeat,
            Self::SetV { .. } => PacketType::SetV,
            Self::SetI { .. } => PacketType::SetI,
            Self::SetIsOutput { .. } => PacketType::SetIsOutput,
            Self::SetCh => PacketType::SetCh,
            Self::SetAddr { .. } => PacketType::SetAddr,
            Self::SetAllAddr { .. } => PacketType::SetAllAddr,
            Self::Rgb { .. } => PacketType::Rgb,
            Self::GetAddr => PacketType::GetAddr,
            Self::GetMachine => PacketType::GetMachine,
            Self::ResetToDfu => PacketType::ResetToDfu,
            Self::StartAutoMatch => PacketType::StartAutoMatch,
            Self::StopAutoMatch => PacketType::StopAutoMatch,
        }
    }

    /// Encodes this command into a frame targeting `channel` (pass
    /// [`crate::BROADCAST_CHANNEL`] for global commands).
    #[must_use]
    pub fn encode(&self, channel: u8) -> RawFrame {
        let mut payload = Vec::new();
        match self {
            Self::Heartbeat
            | Self::SetCh
            | Self::GetAddr
            | Self::GetMachine
            | Self::ResetToDfu
            | Self::StartAutoMatch
            | Self::StopAutoMatch => {}
            Self::SetV {
                voltage_mv,
                current_ma,
            }
            | Self::SetI {
                voltage_mv,
                current_ma,
            } => {
                payload.extend_from_slice(&voltage_mv.to_le_bytes());
                payload.extend_from_slice(&current_ma.to_le_bytes());
            }
            Self::SetIsOutput { state } => payload.push(u8::from(*state)),
            Self::SetAddr { addr, freq_offset } => {
                payload.extend_from_slice(addr);
                payload.push(*freq_offset);
            }
            Self::SetAllAddr { records } => {
                for (addr, freq_offset) in records {
                    payload.extend_from_slice(addr);
                    payload.push(*freq_offset);
                }
            }
            Self::Rgb { state } => payload.push(u8::from(*state)),
        }
        RawFrame::new(self.packet_type().to_u8(), channel, Bytes::from(payload))
    }
}
