//! MPU-6050 inertial measurement unit

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;

use comms_if::eqpt::imu::{ImuReading, Vec3};
use log::warn;
use util::maths::round_dp;

use super::Imu;
use crate::hal::{HalError, I2cDevice};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default I2C address (AD0 low).
pub const MPU6050_ADDRESS: u16 = 0x68;

const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_ACCEL_XOUT_H: u8 = 0x3B;

/// LSB per g at the ±2 g range.
const ACCEL_LSB_PER_G: f64 = 16384.0;

/// LSB per °/s at the ±250 °/s range.
const GYRO_LSB_PER_DPS: f64 = 131.0;

/// Units: m/s^2
const STANDARD_GRAVITY: f64 = 9.80665;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Mpu6050 {
    dev: Box<dyn I2cDevice>,
}

/// Simulated IMU on a gently rolling hull.
pub struct SimImu {
    start: Instant,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Mpu6050 {
    /// Wake the device from sleep.
    pub fn new(mut dev: Box<dyn I2cDevice>) -> Result<Self, HalError> {
        dev.write(&[REG_PWR_MGMT_1, 0x00])?;
        Ok(Self { dev })
    }

    /// Convert a 14 byte burst read starting at `ACCEL_XOUT_H` into a reading.
    pub fn convert(raw: &[u8; 14]) -> ImuReading {
        let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]) as f64;

        let accel = |i: usize| round_dp(word(i) / ACCEL_LSB_PER_G * STANDARD_GRAVITY, 2);
        let gyro = |i: usize| round_dp(word(i) / GYRO_LSB_PER_DPS, 2);

        ImuReading {
            accel: Vec3 { x: accel(0), y: accel(2), z: accel(4) },
            temp: round_dp(word(6) / 340.0 + 36.53, 1),
            gyro: Vec3 { x: gyro(8), y: gyro(10), z: gyro(12) },
        }
    }
}

impl Imu for Mpu6050 {
    fn read(&mut self) -> Option<ImuReading> {
        let mut raw = [0u8; 14];

        match self.dev.write_read(&[REG_ACCEL_XOUT_H], &mut raw) {
            Ok(()) => Some(Self::convert(&raw)),
            Err(e) => {
                warn!("IMU read error: {}", e);
                None
            }
        }
    }
}

impl SimImu {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SimImu {
    fn default() -> Self {
        Self::new()
    }
}

impl Imu for SimImu {
    fn read(&mut self) -> Option<ImuReading> {
        let t = self.start.elapsed().as_secs_f64();
        let roll = 0.1 * (t * 0.8).sin();

        Some(ImuReading {
            accel: Vec3 {
                x: round_dp(0.05 * (t * 0.3).sin(), 2),
                y: round_dp(STANDARD_GRAVITY * roll.sin(), 2),
                z: round_dp(STANDARD_GRAVITY * roll.cos(), 2),
            },
            gyro: Vec3 {
                x: round_dp((0.08 * (t * 0.8).cos()).to_degrees(), 2),
                y: 0.0,
                z: round_dp(0.5 * (t * 0.1).sin(), 2),
            },
            temp: 24.5,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records writes and answers reads with a fixed buffer
    struct MockI2c {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        response: Option<[u8; 14]>,
    }

    impl I2cDevice for MockI2c {
        fn write(&mut self, bytes: &[u8]) -> Result<(), HalError> {
            self.writes.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), HalError> {
            self.writes.lock().unwrap().push(bytes.to_vec());
            match self.response {
                Some(r) => {
                    buffer.copy_from_slice(&r);
                    Ok(())
                },
                None => Err(HalError::I2c("NACK".into())),
            }
        }
    }

    fn raw(words: [i16; 7]) -> [u8; 14] {
        let mut out = [0u8; 14];
        for (i, w) in words.iter().enumerate() {
            out[2 * i..2 * i + 2].copy_from_slice(&w.to_be_bytes());
        }
        out
    }

    #[test]
    fn test_convert() {
        // 1 g on z, -0.5 g on x, 0 degC raw temperature, 1 deg/s on x, -2 deg/s on z
        let reading = Mpu6050::convert(&raw([-8192, 0, 16384, 0, 131, 0, -262]));

        assert_eq!(reading.accel, Vec3 { x: -4.9, y: 0.0, z: 9.81 });
        assert_eq!(reading.gyro, Vec3 { x: 1.0, y: 0.0, z: -2.0 });
        assert_eq!(reading.temp, 36.5);

        let reading = Mpu6050::convert(&raw([0, 0, 0, -3400, 0, 0, 0]));
        assert_eq!(reading.temp, 26.5);
    }

    #[test]
    fn test_read() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let mut imu = Mpu6050::new(Box::new(MockI2c {
            writes: writes.clone(),
            response: Some(raw([0, 0, 16384, 0, 0, 0, 0])),
        })).unwrap();

        let reading = imu.read().unwrap();
        assert_eq!(reading.accel.z, 9.81);

        // Woken, then burst read from the first accelerometer register
        assert_eq!(*writes.lock().unwrap(), vec![vec![0x6B, 0x00], vec![0x3B]]);
    }

    #[test]
    fn test_read_failure() {
        let mut imu = Mpu6050::new(Box::new(MockI2c {
            writes: Arc::new(Mutex::new(Vec::new())),
            response: None,
        })).unwrap();

        assert!(imu.read().is_none());
    }

    #[test]
    fn test_sim_upright() {
        let reading = SimImu::new().read().unwrap();
        assert!(reading.accel.z > 9.0);
    }
}
