//! # Sensors Module
//!
//! The boat's sensors behind narrow blocking traits. The telemetry loop samples them all at once
//! through [`Sensors::sample`] on the blocking thread pool.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod battery;
pub mod camera;
pub mod imu;
pub mod system;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    battery::BatteryReading, gps::Fix, imu::ImuReading, system::SystemStatus,
};
use image::DynamicImage;
use log::{info, warn};

use crate::{
    gps::{serial::SerialPortConnector, sim::SimGpsConnector, GpsSession, SerialConnector},
    hal::HalError,
    params::{Backend, BoatExecParams},
};

use self::{
    battery::SimBattery,
    camera::SimCamera,
    imu::SimImu,
    system::SystemStats,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Imu: Send {
    /// Read the IMU, or `None` if it could not be read this time.
    fn read(&mut self) -> Option<ImuReading>;
}

pub trait Battery: Send {
    /// Read the battery, or `None` if it could not be read this time.
    fn read(&mut self) -> Option<BatteryReading>;
}

pub trait Camera: Send {
    /// Capture a single frame, or `None` if no frame is available.
    fn capture_frame(&mut self) -> Option<DynamicImage>;

    /// Release the device. Later captures return `None`.
    fn release(&mut self);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Every sensor sampled by the telemetry loop.
pub struct Sensors {
    gps: GpsSession,
    imu: Option<Box<dyn Imu>>,
    battery: Box<dyn Battery>,
    system: SystemStats,
}

/// One sample of every sensor.
#[derive(Debug, Clone, Default)]
pub struct SensorReadings {
    pub gps: Option<Fix>,
    pub imu: Option<ImuReading>,
    pub battery: Option<BatteryReading>,
    pub system: Option<SystemStatus>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Sensors {
    pub fn new(
        gps: GpsSession,
        imu: Option<Box<dyn Imu>>,
        battery: Box<dyn Battery>,
        system: SystemStats
    ) -> Self {
        Self { gps, imu, battery, system }
    }

    /// Create the sensors for the configured backend.
    ///
    /// I2C sensors which cannot be reached on the hardware backend are not fatal: a missing IMU
    /// reads as `null`, a missing battery monitor is replaced by the simulated one.
    pub fn from_params(params: &BoatExecParams) -> Self {
        let connector: Box<dyn SerialConnector> = match params.hardware.backend {
            Backend::Sim => Box::new(SimGpsConnector::default()),
            Backend::Gpio => Box::new(SerialPortConnector),
        };
        let gps = GpsSession::new(connector, &params.gps);

        let (imu, battery): (Option<Box<dyn Imu>>, Box<dyn Battery>) =
            match params.hardware.backend {
                Backend::Sim => (Some(Box::new(SimImu::new())), Box::new(SimBattery)),
                Backend::Gpio => (hw::imu(), hw::battery()),
            };

        Self::new(gps, imu, battery, SystemStats::new())
    }

    /// Read every sensor. Blocks for up to the GPS read timeout per scanned line.
    pub fn sample(&mut self) -> SensorReadings {
        SensorReadings {
            gps: self.gps.read(),
            imu: self.imu.as_mut().and_then(|i| i.read()),
            battery: self.battery.read(),
            system: Some(self.system.get_status()),
        }
    }

    /// Close the GPS stream.
    pub fn close(&mut self) {
        self.gps.close();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create the camera for the configured backend.
pub fn camera_from_params(params: &BoatExecParams) -> Result<Box<dyn Camera>, HalError> {
    let (w, h) = (params.broadcast.video_width, params.broadcast.video_height);

    match params.hardware.backend {
        Backend::Sim => {
            info!("Using simulated camera at {}x{}", w, h);
            Ok(Box::new(SimCamera::new(w, h)))
        },
        Backend::Gpio => hw::camera(&params.hardware.video_device, w, h),
    }
}

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
mod hw {
    use super::*;
    use crate::hal::gpio::GpioI2c;

    pub fn imu() -> Option<Box<dyn Imu>> {
        match GpioI2c::new(imu::MPU6050_ADDRESS).and_then(|d| imu::Mpu6050::new(Box::new(d))) {
            Ok(i) => Some(Box::new(i)),
            Err(e) => {
                warn!("IMU init error: {}", e);
                None
            }
        }
    }

    pub fn battery() -> Box<dyn Battery> {
        match GpioI2c::new(battery::INA3221_ADDRESS) {
            Ok(d) => Box::new(battery::Ina3221::new(Box::new(d))),
            Err(e) => {
                warn!("INA3221 init error: {}, using simulated battery", e);
                Box::new(SimBattery)
            }
        }
    }

    pub fn camera(device: &str, width: u32, height: u32) -> Result<Box<dyn Camera>, HalError> {
        Ok(Box::new(camera::V4lCamera::new(device, width, height)?))
    }
}

#[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
mod hw {
    use super::*;

    pub fn imu() -> Option<Box<dyn Imu>> {
        warn!("No I2C bus on this host, IMU disabled");
        None
    }

    pub fn battery() -> Box<dyn Battery> {
        warn!("No I2C bus on this host, using simulated battery");
        Box::new(SimBattery)
    }

    pub fn camera(_device: &str, _width: u32, _height: u32) -> Result<Box<dyn Camera>, HalError> {
        Err(HalError::Unsupported)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::GpsParams;

    #[test]
    fn test_sim_sample() {
        let gps = GpsSession::new(
            Box::new(SimGpsConnector::default()),
            &GpsParams { port: "sim".into(), baudrate: 9600, settle_s: 0.0 }
        );
        let mut sensors = Sensors::new(gps, None, Box::new(SimBattery), SystemStats::new());

        let readings = sensors.sample();
        assert!(readings.gps.unwrap().fix);
        assert!(readings.imu.is_none());
        assert_eq!(readings.battery.unwrap().percentage, 80);
        assert!(readings.system.is_some());

        sensors.close();
    }
}
