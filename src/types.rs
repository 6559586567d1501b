use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Manufacturing date as stored by the pack (two-digit year)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufactureDate {
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

impl ManufactureDate {
    /// Calendar date, assuming the 2000s. `None` if the bytes are not a valid date.
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2000 + self.year as i32, self.month as u32, self.day as u32)
    }
}

impl fmt::Display for ManufactureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/20{:02}", self.day, self.month, self.year)
    }
}

/// Identity and status fields from the message block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub rom_id: [u8; 8],
    pub manufacture_date: ManufactureDate,
    pub charge_count: u16,
    /// Fault latch set
    pub is_locked: bool,
    pub status_code: u8,
    /// Tenths of an amp-hour
    pub capacity: u8,
    /// Opaque chemistry/model code
    pub battery_type: u8,
}

impl Identity {
    /// ROM id as space separated hex, e.g. `28 6A 1F 00 00 00 00 4B`
    pub fn rom_id_hex(&self) -> String {
        self.rom_id
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn capacity_ah(&self) -> f64 {
        self.capacity as f64 / 10.0
    }
}

/// Voltages and temperatures from the data block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    pub pack_voltage_mv: u16,
    pub cell_voltages_mv: [u16; 5],
    /// Hundredths of a degree Celsius; zero means the sensor is not fitted
    pub temperatures_cc: [i16; 2],
}

impl Telemetry {
    pub fn pack_voltage(&self) -> f64 {
        self.pack_voltage_mv as f64 / 1000.0
    }

    /// Spread between the highest and lowest cell in millivolts
    pub fn cell_imbalance_mv(&self) -> u16 {
        let max = self.cell_voltages_mv.iter().copied().max().unwrap_or(0);
        let min = self.cell_voltages_mv.iter().copied().min().unwrap_or(0);
        max - min
    }

    /// Readings of the fitted sensors in degrees Celsius
    pub fn temperatures_c(&self) -> Vec<f64> {
        self.temperatures_cc
            .iter()
            .filter(|&&t| t != 0)
            .map(|&t| t as f64 / 100.0)
            .collect()
    }
}

/// Everything read from a pack, merged across operations.
///
/// Sections stay `None` until the operation that fills them succeeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatterySnapshot {
    pub model: Option<String>,
    pub identity: Option<Identity>,
    pub telemetry: Option<Telemetry>,
}

impl BatterySnapshot {
    pub fn is_locked(&self) -> bool {
        self.identity.map(|i| i.is_locked).unwrap_or(false)
    }
}

impl fmt::Display for BatterySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Battery Information ===")?;
        if let Some(model) = &self.model {
            writeln!(f, "Model: {}", model)?;
        }
        if let Some(id) = &self.identity {
            writeln!(f, "ROM ID: {}", id.rom_id_hex())?;
            writeln!(f, "Charge Count: {}", id.charge_count)?;
            writeln!(f, "Lock Status: {}", if id.is_locked { "LOCKED" } else { "UNLOCKED" })?;
            writeln!(f, "Status Code: 0x{:02X}", id.status_code)?;
            writeln!(f, "Manufacturing Date: {}", id.manufacture_date)?;
            writeln!(f, "Capacity: {:.1} Ah", id.capacity_ah())?;
            writeln!(f, "Battery Type: {}", id.battery_type)?;
        }
        if let Some(t) = &self.telemetry {
            writeln!(f)?;
            writeln!(f, "=== Voltage Data ===")?;
            writeln!(f, "Pack Voltage: {:.3} V", t.pack_voltage())?;
            for (i, mv) in t.cell_voltages_mv.iter().enumerate() {
                writeln!(f, "Cell {}: {:.3} V", i + 1, *mv as f64 / 1000.0)?;
            }
            writeln!(f, "Cell Voltage Difference: {:.3} V", t.cell_imbalance_mv() as f64 / 1000.0)?;

            let temps = t.temperatures_c();
            if !temps.is_empty() {
                writeln!(f)?;
                writeln!(f, "=== Temperature Data ===")?;
                for (i, c) in temps.iter().enumerate() {
                    writeln!(f, "Temperature Sensor {}: {:.2} °C", i + 1, c)?;
                }
            }
        }
        write!(f, "===========================")
    }
}
