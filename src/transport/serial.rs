//! Serial-port bus adapter.
//!
//! The single-wire line is driven by a UART whose TX and RX are tied to the
//! bus through an open-drain buffer. A reset pulse is one `0xF0` frame at
//! 9600 baud; each bit slot is one frame at 115200 baud (`0xFF` writes a 1
//! or opens a read slot, `0x00` writes a 0). What the UART receives back is
//! what the line actually carried. The enable gate is one of the port's
//! modem control outputs.

use super::{EnableLine, OneWireBus};
use crate::constants::*;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

/// Modem control line wired to the pack's enable input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnableSignal {
    /// Request To Send
    #[default]
    Rts,
    /// Data Terminal Ready
    Dtr,
}

/// Which lines and speeds the adapter uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub port_name: String,
    pub enable_signal: EnableSignal,
    pub reset_baud_rate: u32,
    pub data_baud_rate: u32,
    pub timeout_ms: u64,
}

impl AdapterConfig {
    /// Defaults for the given port: RTS as enable, 9600/115200 baud.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            enable_signal: EnableSignal::default(),
            reset_baud_rate: RESET_BAUD_RATE,
            data_baud_rate: DATA_BAUD_RATE,
            timeout_ms: TIMEOUT_MS,
        }
    }

    pub fn with_enable_signal(mut self, signal: EnableSignal) -> Self {
        self.enable_signal = signal;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// UART slots that transmit `byte`, LSB first.
fn byte_to_slots(byte: u8) -> [u8; 8] {
    let mut slots = [SLOT_LOW; 8];
    for (i, slot) in slots.iter_mut().enumerate() {
        if byte & (1 << i) != 0 {
            *slot = SLOT_HIGH;
        }
    }
    slots
}

/// Reassemble a byte from the echoes of eight read slots.
///
/// A slot reads as 1 only if nothing pulled the line low during it.
fn slots_to_byte(echo: &[u8; 8]) -> u8 {
    echo.iter()
        .enumerate()
        .filter(|&(_, &e)| e == SLOT_HIGH)
        .fold(0u8, |acc, (i, _)| acc | (1 << i))
}

/// Bus transport and enable gate on a host serial port
pub struct SerialAdapter {
    port: Box<dyn SerialPort>,
    config: AdapterConfig,
}

impl SerialAdapter {
    /// Open the port and leave the enable line released.
    pub fn open(config: AdapterConfig) -> Result<Self> {
        let port = serialport::new(&config.port_name, config.data_baud_rate)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()?;

        let mut adapter = SerialAdapter { port, config };
        adapter.set_enabled(false)?;
        Ok(adapter)
    }

    /// List available serial ports
    pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
        Ok(serialport::available_ports()?)
    }

    fn transfer_slots(&mut self, slots: &[u8; 8]) -> Result<[u8; 8]> {
        self.port.write_all(slots)?;
        let mut echo = [0u8; 8];
        self.port.read_exact(&mut echo)?;
        Ok(echo)
    }
}

impl OneWireBus for SerialAdapter {
    fn reset(&mut self) -> Result<bool> {
        self.port.set_baud_rate(self.config.reset_baud_rate)?;
        self.port.clear(serialport::ClearBuffer::Input)?;
        self.port.write_all(&[RESET_PULSE])?;

        let mut echo = [0u8; 1];
        let read = self.port.read_exact(&mut echo);
        self.port.set_baud_rate(self.config.data_baud_rate)?;
        read?;

        let present = echo[0] != RESET_PULSE;
        log::trace!("reset: echo {:02X}, presence {}", echo[0], present);
        Ok(present)
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.transfer_slots(&byte_to_slots(byte))?;
        log::trace!("tx {:02X}", byte);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let echo = self.transfer_slots(&[SLOT_HIGH; 8])?;
        let byte = slots_to_byte(&echo);
        log::trace!("rx {:02X}", byte);
        Ok(byte)
    }
}

impl EnableLine for SerialAdapter {
    fn set_enabled(&mut self, asserted: bool) -> Result<()> {
        match self.config.enable_signal {
            EnableSignal::Rts => self.port.write_request_to_send(asserted)?,
            EnableSignal::Dtr => self.port.write_data_terminal_ready(asserted)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_lsb_first() {
        assert_eq!(
            byte_to_slots(0x33),
            [0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00]
        );
        assert_eq!(byte_to_slots(0x80)[7], SLOT_HIGH);
        assert_eq!(byte_to_slots(0x80)[0], SLOT_LOW);
    }

    #[test]
    fn pulled_slots_read_as_zero() {
        // the device pulled bits 1 and 3 low
        let echo = [0xFF, 0xF8, 0xFF, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(slots_to_byte(&echo), 0xF5);
        assert_eq!(slots_to_byte(&[SLOT_HIGH; 8]), 0xFF);
    }

    #[test]
    fn config_defaults() {
        let config = AdapterConfig::new("/dev/ttyUSB0").with_enable_signal(EnableSignal::Dtr);
        assert_eq!(config.enable_signal, EnableSignal::Dtr);
        assert_eq!(config.reset_baud_rate, 9600);
        assert_eq!(config.data_baud_rate, 115_200);
        assert_eq!(config.timeout_ms, TIMEOUT_MS);
        assert_eq!(config.with_timeout_ms(250).timeout_ms, 250);
    }
}
