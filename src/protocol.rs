use crate::decode::{decode_identity, decode_model, decode_telemetry, model_bytes};
use crate::error::{ObiError, Result};
use crate::framing::{run_exchange, Command, Response};
use crate::last_error::{copy_c_bytes, LastError};
use crate::transport::serial::{AdapterConfig, SerialAdapter};
use crate::transport::{EnableGuard, Link};
use crate::types::BatterySnapshot;

/// Main battery interface.
///
/// Owns the bus, the enable line and the last-error slot. Every operation
/// asserts the enable line, runs its exchanges and releases the line again
/// before returning, whatever the outcome.
pub struct Obi<L: Link> {
    link: L,
    last_error: LastError,
}

impl Obi<SerialAdapter> {
    /// Open a serial adapter with default settings
    pub fn open(port_name: &str) -> Result<Self> {
        Self::with_config(AdapterConfig::new(port_name))
    }

    pub fn with_config(config: AdapterConfig) -> Result<Self> {
        Ok(Obi::new(SerialAdapter::open(config)?))
    }
}

impl<L: Link> Obi<L> {
    pub fn new(link: L) -> Self {
        Obi {
            link,
            last_error: LastError::new(),
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Message of the most recent failure. Empty means no message, not success.
    pub fn last_error(&self) -> &str {
        self.last_error.as_str()
    }

    pub fn clear_last_error(&mut self) {
        self.last_error.clear();
    }

    /// Run `body` with the enable line held, recording any failure.
    fn run<T>(&mut self, action: &'static str, body: impl FnOnce(&mut L) -> Result<T>) -> Result<T> {
        let result = match EnableGuard::assert(&mut self.link) {
            Ok(mut guard) => body(&mut guard),
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            let e = match e {
                ObiError::Operation { .. } => e,
                other => ObiError::operation(action, other),
            };
            log::warn!("{}", e);
            self.last_error.set(&e.to_string());
            e
        })
    }

    fn exchange(link: &mut L, command: &Command, action: &'static str) -> Result<Response> {
        run_exchange(link, command).map_err(|e| ObiError::operation(action, e))
    }

    fn model_exchange(&mut self) -> Result<Response> {
        let action = "Failed to read model";
        self.run(action, |link| Self::exchange(link, &Command::MODEL, action))
    }

    /// Read the model name, e.g. `BL1850B`
    pub fn read_model(&mut self) -> Result<String> {
        let response = self.model_exchange()?;
        Ok(decode_model(&response))
    }

    /// Copy the raw model field into a C-style buffer, truncated and NUL-terminated.
    ///
    /// Returns the number of bytes written before the NUL.
    pub fn read_model_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        let response = self.model_exchange()?;
        Ok(copy_c_bytes(dest, model_bytes(&response)))
    }

    /// Read ROM id, manufacture date, charge count, lock flag, status, capacity and type
    pub fn read_identity(&mut self, snapshot: &mut BatterySnapshot) -> Result<()> {
        let action = "Failed to read battery info";
        let response =
            self.run(action, |link| Self::exchange(link, &Command::READ_MESSAGE, action))?;

        let identity = decode_identity(&response);
        log::debug!(
            "identity: rom {}, charges {}, locked {}",
            identity.rom_id_hex(),
            identity.charge_count,
            identity.is_locked
        );
        snapshot.identity = Some(identity);
        Ok(())
    }

    /// Read pack and cell voltages and temperatures
    pub fn read_telemetry(&mut self, snapshot: &mut BatterySnapshot) -> Result<()> {
        let action = "Failed to read battery data";
        let response = self.run(action, |link| Self::exchange(link, &Command::READ_DATA, action))?;

        snapshot.telemetry = Some(decode_telemetry(&response));
        Ok(())
    }

    /// Model, identity and telemetry in one go
    pub fn read_snapshot(&mut self) -> Result<BatterySnapshot> {
        let mut snapshot = BatterySnapshot {
            model: Some(self.read_model()?),
            ..Default::default()
        };
        self.read_identity(&mut snapshot)?;
        self.read_telemetry(&mut snapshot)?;
        Ok(snapshot)
    }

    /// Enter test mode, then send one maintenance command
    fn maintenance(&mut self, command: &Command, action: &'static str) -> Result<()> {
        self.run(action, |link| {
            Self::exchange(link, &Command::TEST_MODE, "Failed to enter test mode")?;
            Self::exchange(link, command, action)?;
            Ok(())
        })
    }

    /// Light the fuel gauge LEDs
    pub fn leds_on(&mut self) -> Result<()> {
        self.maintenance(&Command::LEDS_ON, "Failed to turn LEDs on")
    }

    pub fn leds_off(&mut self) -> Result<()> {
        self.maintenance(&Command::LEDS_OFF, "Failed to turn LEDs off")
    }

    /// Reset the fault latch. Does not check whether it actually cleared.
    pub fn clear_faults(&mut self) -> Result<()> {
        self.maintenance(&Command::RESET_ERRORS, "Failed to clear errors")
    }

    /// Block on the bus's clock, outside any transaction
    pub(crate) fn pause_ms(&mut self, ms: u32) {
        self.link.delay_ms(ms);
    }
}
