//! Simulated battery pack for unit testing and demos.
//!
//! [`SimulatedPack`] implements both the bus and the enable line and answers
//! the commands the real management unit understands, including the
//! test-mode handshake and the fault-latch reset. It keeps a record of the
//! enable line and of every wait so tests can check timing discipline
//! without sleeping.

use crate::constants::*;
use crate::decode::{self, encode_identity, encode_telemetry, MESSAGE_LEN, TELEMETRY_LEN};
use crate::error::{ObiError, Result};
use crate::transport::{EnableLine, OneWireBus};
use crate::types::{Identity, ManufactureDate, Telemetry};
use std::collections::VecDeque;
use std::io;

const ACK: [u8; MAINTENANCE_RESPONSE_LEN] = [0x00; MAINTENANCE_RESPONSE_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Mode-switch sub-command seen, waiting for the next reset
    Switching,
    /// Reset after a mode switch, waiting for the test mode opcode
    AwaitingTestMode,
    Test,
}

#[derive(Debug, Clone)]
pub struct SimulatedPack {
    present: bool,
    enabled: bool,
    latch_stuck: bool,
    enable_failure: bool,
    io_failure: bool,
    model: [u8; MODEL_RESPONSE_LEN],
    message: [u8; MESSAGE_LEN],
    data: [u8; TELEMETRY_LEN],
    mode: Mode,
    leds_on: bool,
    written: Vec<u8>,
    rx: VecDeque<u8>,
    enable_history: Vec<bool>,
    waits_ms: Vec<u32>,
    waited_us: u64,
    resets: usize,
}

impl Default for SimulatedPack {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPack {
    /// An unlocked 5 Ah pack at rest
    pub fn new() -> Self {
        let identity = Identity {
            rom_id: [0x28, 0x6A, 0x1F, 0x33, 0x10, 0x00, 0x00, 0x4B],
            manufacture_date: ManufactureDate {
                year: 19,
                month: 3,
                day: 16,
            },
            charge_count: 142,
            is_locked: false,
            status_code: 0x00,
            capacity: 50,
            battery_type: 0x02,
        };
        let telemetry = Telemetry {
            pack_voltage_mv: 18_520,
            cell_voltages_mv: [3702, 3705, 3701, 3708, 3704],
            temperatures_cc: [2150, 2175],
        };

        SimulatedPack {
            present: true,
            enabled: false,
            latch_stuck: false,
            enable_failure: false,
            io_failure: false,
            model: [0; MODEL_RESPONSE_LEN],
            message: encode_identity(&identity),
            data: encode_telemetry(&telemetry, [0x00, 0x00]),
            mode: Mode::Normal,
            leds_on: false,
            written: Vec::new(),
            rx: VecDeque::new(),
            enable_history: Vec::new(),
            waits_ms: Vec::new(),
            waited_us: 0,
            resets: 0,
        }
        .with_model("BL1850B")
    }

    pub fn with_model(self, model: &str) -> Self {
        self.with_model_bytes(model.as_bytes())
    }

    /// Raw model field, for names that are not plain ASCII
    pub fn with_model_bytes(mut self, model: &[u8]) -> Self {
        self.model = [0; MODEL_RESPONSE_LEN];
        let n = model.len().min(MODEL_RESPONSE_LEN);
        self.model[..n].copy_from_slice(&model[..n]);
        self
    }

    pub fn with_identity(mut self, identity: &Identity) -> Self {
        self.message = encode_identity(identity);
        self
    }

    pub fn with_telemetry(mut self, telemetry: &Telemetry) -> Self {
        self.data = encode_telemetry(telemetry, [0x00, 0x00]);
        self
    }

    /// Raw message block, ROM id first
    pub fn with_message(mut self, message: [u8; MESSAGE_LEN]) -> Self {
        self.message = message;
        self
    }

    /// Take the pack off the bus (or put it back)
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// Overwrite the raw lock status byte
    pub fn set_lock_status(&mut self, status: u8) {
        self.message[decode::message::LOCK_STATUS] = status;
    }

    /// A stuck latch ignores the reset command
    pub fn set_latch_stuck(&mut self, stuck: bool) {
        self.latch_stuck = stuck;
    }

    /// Make asserting the enable line fail
    pub fn set_enable_failure(&mut self, fail: bool) {
        self.enable_failure = fail;
    }

    /// Make every bus write fail like an unplugged adapter
    pub fn set_io_failure(&mut self, fail: bool) {
        self.io_failure = fail;
    }

    pub fn lock_status(&self) -> u8 {
        self.message[decode::message::LOCK_STATUS]
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn leds_on(&self) -> bool {
        self.leds_on
    }

    /// Every level driven onto the enable line, in order
    pub fn enable_history(&self) -> &[bool] {
        &self.enable_history
    }

    /// Every millisecond wait, in order
    pub fn waits_ms(&self) -> &[u32] {
        &self.waits_ms
    }

    /// Total microsecond waits
    pub fn waited_us(&self) -> u64 {
        self.waited_us
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    fn responding(&self) -> bool {
        self.present && self.enabled
    }

    fn respond(&mut self, bytes: &[u8]) {
        self.rx.clear();
        self.rx.extend(bytes.iter().copied());
    }

    fn on_written(&mut self) {
        let written = self.written.clone();
        match written.as_slice() {
            [READ_ROM_PREFIX] => {
                let rom = self.message[..ROM_ID_LEN].to_vec();
                self.respond(&rom);
            }
            [READ_ROM_PREFIX, rest @ ..] if rest == READ_MSG_CMD => {
                let payload = self.message[ROM_ID_LEN..].to_vec();
                self.respond(&payload);
            }
            [SKIP_ROM_PREFIX, rest @ ..] if rest == MODEL_CMD => {
                let model = self.model;
                self.respond(&model);
            }
            [SKIP_ROM_PREFIX, rest @ ..] if rest == READ_DATA_CMD => {
                let data = self.data;
                self.respond(&data);
            }
            [SKIP_ROM_PREFIX, MODE_SWITCH_CMD] => {
                self.mode = Mode::Switching;
            }
            cmd if cmd == TESTMODE_CMD && self.mode == Mode::AwaitingTestMode => {
                self.mode = Mode::Test;
                self.respond(&ACK);
            }
            [SKIP_ROM_PREFIX, rest @ ..] if self.mode == Mode::Test => {
                if rest == LEDS_ON_CMD {
                    self.leds_on = true;
                } else if rest == LEDS_OFF_CMD {
                    self.leds_on = false;
                } else if rest == RESET_ERROR_CMD {
                    if !self.latch_stuck {
                        self.message[decode::message::LOCK_STATUS] &= 0xF0;
                    }
                } else {
                    return;
                }
                self.respond(&ACK);
            }
            _ => {}
        }
    }
}

impl OneWireBus for SimulatedPack {
    fn reset(&mut self) -> Result<bool> {
        self.resets += 1;
        self.written.clear();
        self.rx.clear();
        self.mode = match self.mode {
            Mode::Switching => Mode::AwaitingTestMode,
            Mode::Test => Mode::Test,
            _ => Mode::Normal,
        };
        Ok(self.responding())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.io_failure {
            return Err(ObiError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated adapter failure",
            )));
        }
        if self.responding() {
            self.written.push(byte);
            self.on_written();
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        // an idle line floats high
        if !self.responding() {
            return Ok(0xFF);
        }
        Ok(self.rx.pop_front().unwrap_or(0xFF))
    }

    fn delay_us(&mut self, us: u32) {
        self.waited_us += us as u64;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
    }
}

impl EnableLine for SimulatedPack {
    fn set_enabled(&mut self, asserted: bool) -> Result<()> {
        self.enable_history.push(asserted);
        if asserted && self.enable_failure {
            return Err(ObiError::Io(io::Error::new(
                io::ErrorKind::Other,
                "simulated enable line failure",
            )));
        }
        self.enabled = asserted;
        if !asserted {
            self.mode = Mode::Normal;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{run_exchange, Command};

    fn enabled() -> SimulatedPack {
        let mut pack = SimulatedPack::new();
        pack.set_enabled(true).unwrap();
        pack
    }

    #[test]
    fn answers_model_only_when_enabled() {
        let mut pack = SimulatedPack::new();
        assert!(run_exchange(&mut pack, &Command::MODEL).is_err());

        pack.set_enabled(true).unwrap();
        let rsp = run_exchange(&mut pack, &Command::MODEL).unwrap();
        assert_eq!(&rsp.as_bytes()[..7], b"BL1850B");
    }

    #[test]
    fn every_byte_is_paced() {
        let mut pack = enabled();
        run_exchange(&mut pack, &Command::MODEL).unwrap();
        let bytes = (MODEL_CMD.len() + MODEL_RESPONSE_LEN) as u64;
        assert_eq!(
            pack.waited_us(),
            RESET_RECOVERY_US as u64 + bytes * BYTE_GAP_US as u64
        );
    }

    #[test]
    fn maintenance_needs_test_mode() {
        let mut pack = enabled();
        pack.set_lock_status(0x05);

        run_exchange(&mut pack, &Command::RESET_ERRORS).unwrap();
        assert_eq!(pack.lock_status(), 0x05);

        run_exchange(&mut pack, &Command::TEST_MODE).unwrap();
        run_exchange(&mut pack, &Command::RESET_ERRORS).unwrap();
        assert_eq!(pack.lock_status(), 0x00);
    }

    #[test]
    fn releasing_enable_leaves_test_mode() {
        let mut pack = enabled();
        run_exchange(&mut pack, &Command::TEST_MODE).unwrap();
        pack.set_enabled(false).unwrap();
        pack.set_enabled(true).unwrap();
        run_exchange(&mut pack, &Command::LEDS_ON).unwrap();
        assert!(!pack.leds_on());
    }
}
