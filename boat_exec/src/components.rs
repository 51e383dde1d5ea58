//! # Components
//!
//! The boat's devices, created once from the parameters and shared by the dispatcher, the
//! broadcast loops and the shutdown routine.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{error, info};

use crate::{
    hal::{self, HalError, SimPins},
    motor_ctrl::MotorCtrl,
    params::BoatExecParams,
    pump_ctrl::PumpCtrl,
    sample_log::{SampleLog, SampleLogError},
    sensors::{self, Camera, Sensors},
    servo_ctrl::{ServoCtrl, ServoError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Components {
    pub motors: MotorCtrl,
    pub servos: ServoCtrl,
    pub pumps: PumpCtrl,

    /// Sampled by the telemetry loop on the blocking pool
    pub sensors: Mutex<Sensors>,

    /// Captured by the video loop on the blocking pool
    pub camera: Mutex<Box<dyn Camera>>,

    pub samples: Mutex<SampleLog>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ComponentsError {
    #[error("Could not initialise the motors: {0}")]
    Motors(HalError),

    #[error("Could not initialise the camera servos: {0}")]
    Servos(ServoError),

    #[error("Could not initialise the pump relays: {0}")]
    Pumps(HalError),

    #[error("Could not open the camera: {0}")]
    Camera(HalError),

    #[error("Could not open the sample log: {0}")]
    SampleLog(SampleLogError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Components {
    /// Create every component for the configured backend.
    pub fn from_params(params: &BoatExecParams) -> Result<Self, ComponentsError> {
        Self::with_sim_pins(params, &SimPins::new())
    }

    /// Create every component, using `sim` as the pin bank if the simulated backend is selected.
    pub fn with_sim_pins(params: &BoatExecParams, sim: &SimPins) -> Result<Self, ComponentsError> {
        let backend = params.hardware.backend;
        let pins = &params.pins;

        let motor_out = hal::pulse_output(backend, &[pins.motor_left, pins.motor_right], sim)
            .map_err(ComponentsError::Motors)?;
        let motors = MotorCtrl::new(motor_out, pins.motor_left, pins.motor_right, params.esc_range)
            .map_err(ComponentsError::Motors)?;

        let servo_out = hal::pulse_output(backend, &[pins.camera_pan, pins.camera_tilt], sim)
            .map_err(|e| ComponentsError::Servos(e.into()))?;
        let servos = ServoCtrl::new(servo_out, pins.camera_pan, pins.camera_tilt)
            .map_err(ComponentsError::Servos)?;

        // Relays start off
        let active_low = params.hardware.relay_active_low;
        let relay = hal::relay_output(backend, &pins.pumps, active_low, sim)
            .map_err(ComponentsError::Pumps)?;
        let pumps = PumpCtrl::new(relay, pins.pumps.clone(), active_low);

        let camera = sensors::camera_from_params(params).map_err(ComponentsError::Camera)?;

        let samples = SampleLog::new(&params.data_logging).map_err(ComponentsError::SampleLog)?;

        info!("Components initialised ({:?} backend)", backend);

        Ok(Self {
            motors,
            servos,
            pumps,
            sensors: Mutex::new(Sensors::from_params(params)),
            camera: Mutex::new(camera),
            samples: Mutex::new(samples),
        })
    }

    /// Put every device in a safe state: motors stopped, pumps off, servos centred then
    /// disabled, camera released and GPS closed.
    ///
    /// Every step is attempted even if an earlier one fails. Safe to call more than once.
    pub async fn cleanup(&self) {
        info!("Cleaning up devices...");

        if let Err(e) = self.motors.stop() {
            error!("Could not stop motors: {}", e);
        }

        if let Err(e) = self.pumps.cleanup().await {
            error!("Could not switch off pumps: {}", e);
        }

        if let Err(e) = self.servos.cleanup().await {
            error!("Could not park camera servos: {}", e);
        }

        lock(&self.camera).release();
        lock(&self.sensors).close();

        info!("Device cleanup complete");
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Lock a component, recovering it if a previous holder panicked.
pub fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated-backend parameters with every data file inside `dir`.
#[cfg(test)]
pub(crate) fn sim_params(dir: &std::path::Path) -> BoatExecParams {
    use crate::params::{Backend, DataLoggingParams};

    let mut params: BoatExecParams = util::params::from_toml_str(
        include_str!("../../params/boat_exec.toml")
    ).expect("default params are valid");

    params.hardware.backend = Backend::Sim;
    params.gps.settle_s = 0.0;
    params.data_logging = DataLoggingParams {
        csv_file: dir.join("water_samples.csv").to_string_lossy().into(),
        json_file: dir.join("water_samples.json").to_string_lossy().into(),
        samples_dir: dir.join("samples").to_string_lossy().into(),
    };

    params
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let params = sim_params(dir.path());
        let sim = SimPins::new();

        let c = Components::with_sim_pins(&params, &sim).unwrap();
        let esc_min = params.esc_range.min;

        assert_eq!(sim.pulse(params.pins.motor_left), Some(esc_min));
        assert_eq!(sim.pulse(params.pins.motor_right), Some(esc_min));
        assert_eq!(sim.pulse(params.pins.camera_pan), Some(1500));
        for &pin in &params.pins.pumps {
            assert_eq!(sim.level(pin), Some(true));
        }

        c.pumps.activate(1, 10.0, None).await.unwrap();
        assert_eq!(sim.level(params.pins.pumps[0]), Some(false));

        c.cleanup().await;
        assert_eq!(sim.level(params.pins.pumps[0]), Some(true));
        assert_eq!(sim.pulse(params.pins.camera_pan), Some(0));
        assert_eq!(sim.pulse(params.pins.camera_tilt), Some(0));
        assert!(lock(&c.camera).capture_frame().is_none());

        // Second cleanup is harmless
        c.cleanup().await;
        assert_eq!(sim.pulse(params.pins.motor_left), Some(esc_min));
    }
}
