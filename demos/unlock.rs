//! Presence Monitor Example
//!
//! Polls the adapter for a pack, prints each pack that is connected and
//! offers to clear the fault latch of locked packs.
//!
//! Usage:
//!   cargo run --example unlock -- /dev/ttyUSB0
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example unlock -- /dev/ttyUSB0

use battery_obi::{MonitorConfig, Obi, PresenceEvent, PresenceMonitor, Result, UnlockOutcome};
use inquire::Confirm;
use log::{error, info, warn};
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(port_name) = std::env::args().nth(1) else {
        eprintln!("Usage: unlock <serial port>");
        std::process::exit(1);
    };

    info!("Connecting to battery adapter on {}...", port_name);
    let mut obi = Obi::open(&port_name)?;
    let mut monitor = PresenceMonitor::new(MonitorConfig::default());

    info!("Waiting for a battery...");
    loop {
        match monitor.tick(&mut obi, Instant::now()) {
            Some(PresenceEvent::Connected(snapshot)) => println!("{}", snapshot),
            Some(PresenceEvent::ReadFailed { model, reason }) => {
                error!("{} connected but could not be read: {}", model, reason)
            }
            Some(PresenceEvent::Disconnected) => info!("Battery removed"),
            None => {}
        }

        if monitor.clear_offer_pending() {
            let confirm = Confirm::new("Battery is locked. Clear the fault latch?")
                .with_default(false)
                .prompt()
                .unwrap_or(false);

            match monitor.resolve_clear_offer(&mut obi, confirm) {
                Ok(Some(UnlockOutcome::Unlocked)) => info!("Battery unlocked"),
                Ok(Some(UnlockOutcome::StillLocked { status_code })) => warn!(
                    "Still locked (status 0x{:02X}); the fault may be physical",
                    status_code
                ),
                Ok(Some(UnlockOutcome::Declined)) | Ok(None) => {}
                Err(e) => error!("Clear failed: {} ({})", e, obi.last_error()),
            }
        }

        std::thread::sleep(Duration::from_millis(100));
    }
}
