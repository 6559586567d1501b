//! Request/response framing on the single-wire bus.
//!
//! Every command the pack understands is one of three exchange shapes.
//! [`run_exchange`] drives any of them and hands back the raw bytes; field
//! meaning is left to [`crate::decode`].

use crate::constants::*;
use crate::error::{ObiError, Result};
use crate::transport::OneWireBus;

/// How a command is addressed on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Read-ROM prefix: the 8-byte ROM id precedes the response.
    Broadcast,
    /// Skip-ROM prefix, then the opcode.
    Direct,
    /// Skip-ROM plus mode-switch sub-command, a settle hold and a second
    /// reset before the opcode.
    ModeSwitch,
}

/// Immutable description of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub framing: Framing,
    pub opcode: &'static [u8],
    pub response_len: usize,
}

impl Command {
    pub const READ_MESSAGE: Command = Command {
        framing: Framing::Broadcast,
        opcode: &READ_MSG_CMD,
        response_len: READ_MSG_RESPONSE_LEN,
    };

    pub const MODEL: Command = Command {
        framing: Framing::Direct,
        opcode: &MODEL_CMD,
        response_len: MODEL_RESPONSE_LEN,
    };

    pub const READ_DATA: Command = Command {
        framing: Framing::Direct,
        opcode: &READ_DATA_CMD,
        response_len: READ_DATA_RESPONSE_LEN,
    };

    pub const TEST_MODE: Command = Command {
        framing: Framing::ModeSwitch,
        opcode: &TESTMODE_CMD,
        response_len: MAINTENANCE_RESPONSE_LEN,
    };

    pub const LEDS_ON: Command = Command {
        framing: Framing::Direct,
        opcode: &LEDS_ON_CMD,
        response_len: MAINTENANCE_RESPONSE_LEN,
    };

    pub const LEDS_OFF: Command = Command {
        framing: Framing::Direct,
        opcode: &LEDS_OFF_CMD,
        response_len: MAINTENANCE_RESPONSE_LEN,
    };

    pub const RESET_ERRORS: Command = Command {
        framing: Framing::Direct,
        opcode: &RESET_ERROR_CMD,
        response_len: MAINTENANCE_RESPONSE_LEN,
    };

    /// Total bytes captured by the exchange, including a leading ROM id.
    pub const fn buffer_len(&self) -> usize {
        match self.framing {
            Framing::Broadcast => ROM_ID_LEN + self.response_len,
            Framing::Direct | Framing::ModeSwitch => self.response_len,
        }
    }
}

/// Raw bytes captured during one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response(Vec<u8>);

impl Response {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Copy into a fixed layout, zero-filling anything the exchange did not capture.
    pub fn to_layout<const N: usize>(&self) -> [u8; N] {
        let mut out = [0u8; N];
        let n = self.0.len().min(N);
        out[..n].copy_from_slice(&self.0[..n]);
        out
    }
}

impl From<Vec<u8>> for Response {
    fn from(bytes: Vec<u8>) -> Self {
        Response(bytes)
    }
}

fn reset_line<B: OneWireBus + ?Sized>(bus: &mut B) -> Result<()> {
    if !bus.reset()? {
        return Err(ObiError::NoPresence);
    }
    bus.delay_us(RESET_RECOVERY_US);
    Ok(())
}

fn write_paced<B: OneWireBus + ?Sized>(bus: &mut B, bytes: &[u8]) -> Result<()> {
    for &byte in bytes {
        bus.delay_us(BYTE_GAP_US);
        bus.write_byte(byte)?;
    }
    Ok(())
}

fn read_paced<B: OneWireBus + ?Sized>(bus: &mut B, buf: &mut Vec<u8>, count: usize) -> Result<()> {
    for _ in 0..count {
        bus.delay_us(BYTE_GAP_US);
        buf.push(bus.read_byte()?);
    }
    Ok(())
}

/// Run one exchange and return everything read back.
///
/// Fails only if the adapter fails or no presence pulse follows a reset;
/// the content of the response is never checked.
pub fn run_exchange<B: OneWireBus + ?Sized>(bus: &mut B, command: &Command) -> Result<Response> {
    let mut buf = Vec::with_capacity(command.buffer_len());

    match command.framing {
        Framing::Broadcast => {
            reset_line(bus)?;
            bus.write_byte(READ_ROM_PREFIX)?;
            read_paced(bus, &mut buf, ROM_ID_LEN)?;
        }
        Framing::Direct => {
            reset_line(bus)?;
            bus.write_byte(SKIP_ROM_PREFIX)?;
        }
        Framing::ModeSwitch => {
            reset_line(bus)?;
            bus.write_byte(SKIP_ROM_PREFIX)?;
            write_paced(bus, &[MODE_SWITCH_CMD])?;
            bus.delay_ms(MODE_SWITCH_SETTLE_MS);
            reset_line(bus)?;
        }
    }

    write_paced(bus, command.opcode)?;
    read_paced(bus, &mut buf, command.response_len)?;

    log::debug!(
        "{:?} {:02X?} -> {:02X?}",
        command.framing,
        command.opcode,
        buf
    );
    Ok(Response(buf))
}
