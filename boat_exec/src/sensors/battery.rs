//! INA3221 battery monitor with a LiFePO4 charge curve

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::battery::{BatteryReading, BatteryStatus};
use log::warn;
use util::maths::round_dp;

use super::Battery;
use crate::hal::I2cDevice;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default I2C address (A0 to GND).
pub const INA3221_ADDRESS: u16 = 0x40;

/// Channel 1 bus voltage register.
const REG_CH1_BUS_VOLTAGE: u8 = 0x02;

/// Units: volts per LSB
const BUS_VOLTAGE_LSB_V: f64 = 0.008;

/// 4S LiFePO4 resting voltage to state of charge, in descending voltage order.
///
/// Units: (volts, percent)
pub const LIFEPO4_CURVE: [(f64, u8); 12] = [
    (13.6, 100),
    (13.4, 95),
    (13.3, 90),
    (13.2, 80),
    (13.1, 70),
    (13.0, 60),
    (12.9, 50),
    (12.8, 40),
    (12.7, 30),
    (12.6, 20),
    (12.4, 10),
    (12.0, 0),
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Ina3221 {
    dev: Box<dyn I2cDevice>,
}

/// Simulated battery which always reports a healthy pack.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimBattery;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Ina3221 {
    pub fn new(dev: Box<dyn I2cDevice>) -> Self {
        Self { dev }
    }

    /// Build a reading from a measured pack voltage.
    pub fn reading(voltage: f64) -> BatteryReading {
        let percentage = lifepo4_percentage(voltage);

        BatteryReading {
            voltage: round_dp(voltage, 2),
            percentage,
            status: BatteryStatus::from_percentage(percentage),
        }
    }
}

impl Battery for Ina3221 {
    fn read(&mut self) -> Option<BatteryReading> {
        let mut raw = [0u8; 2];

        if let Err(e) = self.dev.write_read(&[REG_CH1_BUS_VOLTAGE], &mut raw) {
            warn!("Battery read error: {}", e);
            return None;
        }

        // Bits 15..3 hold the measurement
        let voltage = (i16::from_be_bytes(raw) >> 3) as f64 * BUS_VOLTAGE_LSB_V;

        Some(Self::reading(voltage))
    }
}

impl Battery for SimBattery {
    fn read(&mut self) -> Option<BatteryReading> {
        Some(BatteryReading {
            voltage: 13.2,
            percentage: 80,
            status: BatteryStatus::Good,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// State of charge of the pack by linear interpolation over [`LIFEPO4_CURVE`], truncated to a
/// whole percent.
pub fn lifepo4_percentage(voltage: f64) -> u8 {
    let (v_max, p_max) = LIFEPO4_CURVE[0];
    let (v_min, p_min) = LIFEPO4_CURVE[LIFEPO4_CURVE.len() - 1];

    if voltage >= v_max {
        return p_max;
    }
    if voltage <= v_min {
        return p_min;
    }

    for pair in LIFEPO4_CURVE.windows(2) {
        let (v1, p1) = pair[0];
        let (v2, p2) = pair[1];

        if v2 <= voltage && voltage <= v1 {
            let p = p2 as f64 + (voltage - v2) * (p1 as f64 - p2 as f64) / (v1 - v2);
            return p as u8;
        }
    }

    0
}
