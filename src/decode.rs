//! Field maps for the pack's response blocks.
//!
//! All offsets are fixed. Decoding never fails: a short response is
//! zero-filled to its layout first, so garbage in gives defined garbage out.
//! Whether the values mean anything is decided by the exchange succeeding.

use crate::constants::{MODEL_NAME_LEN, READ_DATA_RESPONSE_LEN, READ_MSG_RESPONSE_LEN, ROM_ID_LEN};
use crate::framing::Response;
use crate::types::{Identity, ManufactureDate, Telemetry};

/// Length of the message block including the leading ROM id
pub const MESSAGE_LEN: usize = ROM_ID_LEN + READ_MSG_RESPONSE_LEN;

/// Length of the data block
pub const TELEMETRY_LEN: usize = READ_DATA_RESPONSE_LEN;

/// Offsets into the message block (ROM id first)
pub mod message {
    pub const ROM_ID: usize = 0;
    pub const YEAR: usize = 10;
    pub const MONTH: usize = 11;
    pub const DAY: usize = 12;
    /// nibble swapped
    pub const BATTERY_TYPE: usize = 29;
    /// nibble swapped, tenths of Ah
    pub const CAPACITY: usize = 34;
    pub const STATUS_CODE: usize = 37;
    /// low nibble is the fault latch
    pub const LOCK_STATUS: usize = 38;
    /// nibble swapped
    pub const CHARGE_COUNT_LOW: usize = 44;
    /// nibble swapped
    pub const CHARGE_COUNT_HIGH: usize = 45;
}

/// Offsets into the data block (all little endian)
pub mod telemetry {
    pub const PACK_VOLTAGE: usize = 0;
    pub const CELL_VOLTAGES: usize = 2;
    /// Not interpreted, but the temperatures sit behind it
    pub const RESERVED: usize = 12;
    pub const TEMPERATURES: usize = 14;
}

/// Exchange the high and low halves of a byte. Its own inverse.
pub const fn nibble_swap(byte: u8) -> u8 {
    byte.rotate_left(4)
}

/// Charge count from its two scrambled source bytes.
///
/// The top nibble of the 16-bit value carries no count and is dropped.
pub fn charge_count(high_raw: u8, low_raw: u8) -> u16 {
    u16::from_be_bytes([nibble_swap(high_raw), nibble_swap(low_raw)]) & 0x0FFF
}

/// Any bit in the low nibble means the fault latch is set.
pub fn is_locked(lock_status: u8) -> bool {
    lock_status & 0x0F != 0
}

fn u16_le(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn i16_le(buf: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([buf[at], buf[at + 1]])
}

/// Decode the identity/status fields of a broadcast message exchange.
pub fn decode_identity(response: &Response) -> Identity {
    let buf: [u8; MESSAGE_LEN] = response.to_layout();

    let mut rom_id = [0u8; ROM_ID_LEN];
    rom_id.copy_from_slice(&buf[message::ROM_ID..message::ROM_ID + ROM_ID_LEN]);

    Identity {
        rom_id,
        manufacture_date: ManufactureDate {
            year: buf[message::YEAR],
            month: buf[message::MONTH],
            day: buf[message::DAY],
        },
        charge_count: charge_count(
            buf[message::CHARGE_COUNT_HIGH],
            buf[message::CHARGE_COUNT_LOW],
        ),
        is_locked: is_locked(buf[message::LOCK_STATUS]),
        status_code: buf[message::STATUS_CODE],
        capacity: nibble_swap(buf[message::CAPACITY]),
        battery_type: nibble_swap(buf[message::BATTERY_TYPE]),
    }
}

/// Decode voltages and temperatures from a data exchange.
pub fn decode_telemetry(response: &Response) -> Telemetry {
    let buf: [u8; TELEMETRY_LEN] = response.to_layout();

    let mut cell_voltages_mv = [0u16; 5];
    for (i, cell) in cell_voltages_mv.iter_mut().enumerate() {
        *cell = u16_le(&buf, telemetry::CELL_VOLTAGES + i * 2);
    }

    Telemetry {
        pack_voltage_mv: u16_le(&buf, telemetry::PACK_VOLTAGE),
        cell_voltages_mv,
        temperatures_cc: [
            i16_le(&buf, telemetry::TEMPERATURES),
            i16_le(&buf, telemetry::TEMPERATURES + 2),
        ],
    }
}

/// Raw model field: the first seven bytes, cut at a NUL.
pub fn model_bytes(response: &Response) -> &[u8] {
    let bytes = response.as_bytes();
    let field = &bytes[..bytes.len().min(MODEL_NAME_LEN)];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// Model name as text. Bytes that are not UTF-8 show as U+FFFD.
pub fn decode_model(response: &Response) -> String {
    String::from_utf8_lossy(model_bytes(response)).into_owned()
}

/// Lay telemetry back out as the pack sends it.
pub fn encode_telemetry(t: &Telemetry, reserved: [u8; 2]) -> [u8; TELEMETRY_LEN] {
    let mut buf = [0u8; TELEMETRY_LEN];
    buf[telemetry::PACK_VOLTAGE..telemetry::PACK_VOLTAGE + 2]
        .copy_from_slice(&t.pack_voltage_mv.to_le_bytes());
    for (i, mv) in t.cell_voltages_mv.iter().enumerate() {
        let at = telemetry::CELL_VOLTAGES + i * 2;
        buf[at..at + 2].copy_from_slice(&mv.to_le_bytes());
    }
    buf[telemetry::RESERVED..telemetry::RESERVED + 2].copy_from_slice(&reserved);
    for (i, cc) in t.temperatures_cc.iter().enumerate() {
        let at = telemetry::TEMPERATURES + i * 2;
        buf[at..at + 2].copy_from_slice(&cc.to_le_bytes());
    }
    buf
}

/// Lay an identity out as a message block, scrambling where the pack does.
///
/// The lock status byte is written as `0x01` when locked.
pub fn encode_identity(id: &Identity) -> [u8; MESSAGE_LEN] {
    let mut buf = [0u8; MESSAGE_LEN];
    buf[message::ROM_ID..message::ROM_ID + ROM_ID_LEN].copy_from_slice(&id.rom_id);
    buf[message::YEAR] = id.manufacture_date.year;
    buf[message::MONTH] = id.manufacture_date.month;
    buf[message::DAY] = id.manufacture_date.day;
    let [high, low] = id.charge_count.to_be_bytes();
    buf[message::CHARGE_COUNT_HIGH] = nibble_swap(high);
    buf[message::CHARGE_COUNT_LOW] = nibble_swap(low);
    buf[message::LOCK_STATUS] = id.is_locked as u8;
    buf[message::STATUS_CODE] = id.status_code;
    buf[message::CAPACITY] = nibble_swap(id.capacity);
    buf[message::BATTERY_TYPE] = nibble_swap(id.battery_type);
    buf
}
