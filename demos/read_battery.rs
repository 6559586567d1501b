//! Read Battery Example
//!
//! Reads model, identity and telemetry from a pack and prints them,
//! followed by a JSON export of the same snapshot.
//!
//! Usage:
//!   cargo run --example read_battery                  # Interactive mode
//!   cargo run --example read_battery -- /dev/ttyUSB0  # Specify port
//!   cargo run --example read_battery -- sim           # Simulated pack
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example read_battery

use battery_obi::{Link, Obi, Result, SerialAdapter, SimulatedPack};
use inquire::Select;
use log::{error, info};

/// Interactive serial port selection using inquire
fn select_port() -> Result<String> {
    let ports = SerialAdapter::list_ports()?;

    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let port_names: Vec<String> = ports
        .iter()
        .map(|p| format!("{} - {:?}", p.port_name, p.port_type))
        .collect();

    let selection = Select::new("Select a serial port:", port_names)
        .prompt()
        .map_err(|e| std::io::Error::other(format!("Selection cancelled: {}", e)))?;

    let port_name = selection
        .split(" - ")
        .next()
        .unwrap_or_default()
        .to_string();
    Ok(port_name)
}

fn report<L: Link>(obi: &mut Obi<L>) {
    match obi.read_snapshot() {
        Ok(snapshot) => {
            println!("{}", snapshot);
            if let Ok(json) = serde_json::to_string_pretty(&snapshot) {
                info!("JSON Export:");
                info!("{}", json);
            }
        }
        Err(e) => {
            error!("Failed to read battery: {}", e);
            error!("Last error: {}", obi.last_error());
            error!("Check that the pack is seated and the adapter is wired:");
            error!("   - bus to the pack's data contact");
            error!("   - enable line (RTS) to the interface enable");
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port_name = std::env::args()
        .nth(1)
        .map(Ok)
        .unwrap_or_else(select_port)?;

    if port_name == "sim" {
        info!("Using a simulated pack");
        report(&mut Obi::new(SimulatedPack::new()));
        return Ok(());
    }

    info!("Connecting to battery adapter on {}...", port_name);
    let mut obi = Obi::open(&port_name)?;
    report(&mut obi);

    Ok(())
}
