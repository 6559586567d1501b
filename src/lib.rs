//! # Battery OBI Library
//!
//! A Rust library for talking to the management unit inside Makita LXT
//! battery packs over their single-wire data contact. It drives the
//! reset/presence handshake and byte timing, frames the pack's commands, and
//! decodes its partly scrambled responses.
//!
//! ## Features
//!
//! - Read model, ROM id, manufacture date, charge count, capacity and type
//! - Read pack and cell voltages and temperatures
//! - Toggle the fuel gauge LEDs and clear the fault latch
//! - Detect packs being connected and removed, and verify fault clears
//! - Run against a serial bus adapter or an in-process simulated pack
//!
//! ## Example
//!
//! ```no_run
//! use battery_obi::Obi;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut obi = Obi::open("/dev/ttyUSB0")?;
//!     let snapshot = obi.read_snapshot()?;
//!     println!("{}", snapshot);
//!     Ok(())
//! }
//! ```

pub mod constants;
pub mod decode;
pub mod error;
pub mod framing;
pub mod last_error;
pub mod monitor;
pub mod protocol;
pub mod simulation;
pub mod transport;
pub mod types;

pub use error::{ObiError, Result};
pub use monitor::{unlock, MonitorConfig, PresenceEvent, PresenceMonitor, PresenceState, UnlockOutcome};
pub use protocol::Obi;
pub use simulation::SimulatedPack;
pub use transport::serial::{AdapterConfig, EnableSignal, SerialAdapter};
pub use transport::{EnableLine, Link, OneWireBus};
pub use types::*;
