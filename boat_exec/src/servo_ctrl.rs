//! # Servo Control Module
//!
//! Pan/tilt camera gimbal control. The pose is owned by a single async mutex, every mutation and
//! every status read goes through it, so a smooth move is never interleaved with other commands.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use comms_if::{
    eqpt::servo::ServoStatus,
    tc::{PanDirection, ServoCmd, TiltDirection},
};
use log::{debug, info};
use tokio::sync::{Mutex, MutexGuard};
use util::maths::{clamp, lerp, lin_map};

use crate::hal::{HalError, PulseOutput};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Units: degrees
pub const MIN_ANGLE_DEG: f64 = 0.0;

/// Units: degrees
pub const MAX_ANGLE_DEG: f64 = 180.0;

/// Units: degrees
pub const CENTRE_ANGLE_DEG: f64 = 90.0;

/// Pulse width at `MIN_ANGLE_DEG`.
///
/// Units: microseconds
pub const MIN_PULSE_US: f64 = 500.0;

/// Pulse width at `MAX_ANGLE_DEG`.
///
/// Units: microseconds
pub const MAX_PULSE_US: f64 = 2500.0;

/// Time allowed for the servos to reach centre before they are disabled at shutdown.
pub const CLEANUP_SETTLE: Duration = Duration::from_millis(500);

/// Named poses as `(name, pan, tilt)`.
pub const PRESETS: [(&str, f64, f64); 6] = [
    ("center", 90.0, 90.0),
    ("front", 90.0, 45.0),
    ("left", 135.0, 90.0),
    ("right", 45.0, 90.0),
    ("up", 90.0, 45.0),
    ("down", 90.0, 135.0),
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ServoCtrl {
    pan_pin: u8,
    tilt_pin: u8,
    state: Mutex<ServoState>,
}

struct ServoState {
    pan_angle: f64,
    tilt_angle: f64,
    driver: Box<dyn PulseOutput>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Pan,
    Tilt,
}

#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    #[error("{0:?} angle {1} is outside [0, 180]")]
    AngleOutOfRange(Axis, f64),

    #[error("Step {0} is not a finite number of degrees")]
    InvalidStep(f64),

    #[error("Delay {0} is not a valid number of seconds")]
    InvalidDelay(f64),

    #[error("Unknown preset {0:?}")]
    UnknownPreset(String),

    #[error(transparent)]
    Hal(#[from] HalError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoCtrl {
    /// Create a new controller and move both servos to centre.
    pub fn new(
        mut driver: Box<dyn PulseOutput>,
        pan_pin: u8,
        tilt_pin: u8
    ) -> Result<Self, ServoError> {
        driver.set_pulse_width(pan_pin, angle_to_pulse(CENTRE_ANGLE_DEG))?;
        driver.set_pulse_width(tilt_pin, angle_to_pulse(CENTRE_ANGLE_DEG))?;

        info!("Camera servos initialised on pan GPIO{}, tilt GPIO{}", pan_pin, tilt_pin);

        Ok(Self {
            pan_pin,
            tilt_pin,
            state: Mutex::new(ServoState {
                pan_angle: CENTRE_ANGLE_DEG,
                tilt_angle: CENTRE_ANGLE_DEG,
                driver,
            }),
        })
    }

    pub async fn set_pan(&self, angle: f64) -> Result<(), ServoError> {
        let mut state = self.state.lock().await;
        self.write(&mut state, Axis::Pan, angle)
    }

    pub async fn set_tilt(&self, angle: f64) -> Result<(), ServoError> {
        let mut state = self.state.lock().await;
        self.write(&mut state, Axis::Tilt, angle)
    }

    /// Set both axes. Each axis is set independently, if either is rejected the error is
    /// returned after the other has been applied.
    pub async fn set_angles(&self, pan: f64, tilt: f64) -> Result<(), ServoError> {
        let mut state = self.state.lock().await;
        self.write_both(&mut state, pan, tilt)
    }

    /// Move the pan axis by `step` degrees, saturating at the limits.
    pub async fn move_pan(&self, direction: PanDirection, step: f64) -> Result<(), ServoError> {
        check_step(step)?;

        let mut state = self.state.lock().await;
        let angle = match direction {
            PanDirection::Left => (state.pan_angle + step).min(MAX_ANGLE_DEG),
            PanDirection::Right => (state.pan_angle - step).max(MIN_ANGLE_DEG),
        };
        self.write(&mut state, Axis::Pan, angle)
    }

    /// Move the tilt axis by `step` degrees, saturating at the limits.
    pub async fn move_tilt(&self, direction: TiltDirection, step: f64) -> Result<(), ServoError> {
        check_step(step)?;

        let mut state = self.state.lock().await;
        let angle = match direction {
            TiltDirection::Up => (state.tilt_angle - step).max(MIN_ANGLE_DEG),
            TiltDirection::Down => (state.tilt_angle + step).min(MAX_ANGLE_DEG),
        };
        self.write(&mut state, Axis::Tilt, angle)
    }

    pub async fn center(&self) -> Result<(), ServoError> {
        self.set_angles(CENTRE_ANGLE_DEG, CENTRE_ANGLE_DEG).await
    }

    /// Move to one of the named [`PRESETS`].
    pub async fn apply_preset(&self, name: &str) -> Result<(), ServoError> {
        let (_, pan, tilt) = PRESETS.iter()
            .find(|(n, _, _)| *n == name)
            .ok_or_else(|| ServoError::UnknownPreset(name.into()))?;

        self.set_angles(*pan, *tilt).await
    }

    /// Move to the target pose through `steps` linearly interpolated poses, waiting `delay`
    /// after each one. The pose lock is held for the whole motion.
    pub async fn smooth_move(
        &self,
        target_pan: f64,
        target_tilt: f64,
        steps: u32,
        delay: Duration
    ) -> Result<(), ServoError> {
        check_angle(Axis::Pan, target_pan)?;
        check_angle(Axis::Tilt, target_tilt)?;

        let mut state = self.state.lock().await;

        if steps == 0 {
            return self.write_both(&mut state, target_pan, target_tilt);
        }

        let (start_pan, start_tilt) = (state.pan_angle, state.tilt_angle);

        for i in 1..=steps {
            let frac = i as f64 / steps as f64;
            self.write_both(
                &mut state,
                lerp(start_pan, target_pan, frac),
                lerp(start_tilt, target_tilt, frac)
            )?;

            tokio::time::sleep(delay).await;
        }

        debug!("Smooth move to ({}, {}) complete", target_pan, target_tilt);

        Ok(())
    }

    /// Execute a servo telecommand.
    pub async fn handle_command(&self, cmd: &ServoCmd) -> Result<(), ServoError> {
        match cmd {
            ServoCmd::Pan { direction, step } => self.move_pan(*direction, *step).await,
            ServoCmd::Tilt { direction, step } => self.move_tilt(*direction, *step).await,
            ServoCmd::SetPan { angle } => self.set_pan(*angle).await,
            ServoCmd::SetTilt { angle } => self.set_tilt(*angle).await,
            ServoCmd::Center => self.center().await,
            ServoCmd::Preset { name } => self.apply_preset(name).await,
            ServoCmd::Smooth { pan, tilt, steps, delay_s } => {
                let delay = Duration::try_from_secs_f64(*delay_s)
                    .map_err(|_| ServoError::InvalidDelay(*delay_s))?;
                self.smooth_move(*pan, *tilt, *steps, delay).await
            }
        }
    }

    pub async fn get_status(&self) -> ServoStatus {
        let state = self.state.lock().await;

        ServoStatus {
            pan_angle: state.pan_angle,
            tilt_angle: state.tilt_angle,
            pan_pin: self.pan_pin,
            tilt_pin: self.tilt_pin,
        }
    }

    /// Centre the camera, wait for the servos to settle, then disable both outputs.
    ///
    /// Every step is attempted even if an earlier one fails, the first error is returned.
    pub async fn cleanup(&self) -> Result<(), ServoError> {
        let centred = self.center().await;

        tokio::time::sleep(CLEANUP_SETTLE).await;

        let mut state = self.state.lock().await;
        let pan_off = state.driver.set_pulse_width(self.pan_pin, 0);
        let tilt_off = state.driver.set_pulse_width(self.tilt_pin, 0);

        info!("Camera servos disabled");

        centred?;
        pan_off?;
        tilt_off?;
        Ok(())
    }

    /// Validate and apply an angle on one axis.
    fn write(
        &self,
        state: &mut MutexGuard<'_, ServoState>,
        axis: Axis,
        angle: f64
    ) -> Result<(), ServoError> {
        check_angle(axis, angle)?;

        let pin = match axis {
            Axis::Pan => self.pan_pin,
            Axis::Tilt => self.tilt_pin,
        };

        match axis {
            Axis::Pan => state.pan_angle = angle,
            Axis::Tilt => state.tilt_angle = angle,
        }
        state.driver.set_pulse_width(pin, angle_to_pulse(angle))?;

        Ok(())
    }

    fn write_both(
        &self,
        state: &mut MutexGuard<'_, ServoState>,
        pan: f64,
        tilt: f64
    ) -> Result<(), ServoError> {
        let pan_res = self.write(state, Axis::Pan, pan);
        let tilt_res = self.write(state, Axis::Tilt, tilt);
        pan_res.and(tilt_res)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a servo angle into a pulse width, clamping the angle to `[0, 180]`.
///
/// Units: degrees to microseconds
pub fn angle_to_pulse(angle: f64) -> u32 {
    let angle = clamp(angle, MIN_ANGLE_DEG, MAX_ANGLE_DEG);

    lin_map(
        (MIN_ANGLE_DEG, MAX_ANGLE_DEG),
        (MIN_PULSE_US, MAX_PULSE_US),
        angle
    ) as u32
}

fn check_angle(axis: Axis, angle: f64) -> Result<(), ServoError> {
    if (MIN_ANGLE_DEG..=MAX_ANGLE_DEG).contains(&angle) {
        Ok(())
    }
    else {
        Err(ServoError::AngleOutOfRange(axis, angle))
    }
}

fn check_step(step: f64) -> Result<(), ServoError> {
    if step.is_finite() {
        Ok(())
    }
    else {
        Err(ServoError::InvalidStep(step))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::{PinWrite, SimPins};
    use std::sync::Arc;

    const PAN: u8 = 12;
    const TILT: u8 = 13;

    fn servos() -> (ServoCtrl, SimPins) {
        let pins = SimPins::new();
        let ctrl = ServoCtrl::new(Box::new(pins.clone()), PAN, TILT).unwrap();
        (ctrl, pins)
    }

    async fn pose(ctrl: &ServoCtrl) -> (f64, f64) {
        let s = ctrl.get_status().await;
        (s.pan_angle, s.tilt_angle)
    }

    #[test]
    fn test_angle_to_pulse() {
        assert_eq!(angle_to_pulse(0.0), 500);
        assert_eq!(angle_to_pulse(90.0), 1500);
        assert_eq!(angle_to_pulse(180.0), 2500);

        // Clamped
        assert_eq!(angle_to_pulse(-10.0), 500);
        assert_eq!(angle_to_pulse(270.0), 2500);

        // Truncated
        assert_eq!(angle_to_pulse(0.1), 501);

        // Monotonic
        let mut last = 0;
        for a in 0..=180 {
            let p = angle_to_pulse(a as f64);
            assert!(p >= last);
            last = p;
        }
    }

    #[tokio::test]
    async fn test_starts_centred() {
        let (ctrl, pins) = servos();
        assert_eq!(pose(&ctrl).await, (90.0, 90.0));
        assert_eq!(pins.pulse(PAN), Some(1500));
        assert_eq!(pins.pulse(TILT), Some(1500));

        let status = ctrl.get_status().await;
        assert_eq!(status.pan_pin, PAN);
        assert_eq!(status.tilt_pin, TILT);
    }

    #[tokio::test]
    async fn test_set_rejects_out_of_range() {
        let (ctrl, pins) = servos();
        pins.clear_history();

        assert!(matches!(
            ctrl.set_pan(181.0).await,
            Err(ServoError::AngleOutOfRange(Axis::Pan, _))
        ));
        assert!(ctrl.set_tilt(-1.0).await.is_err());
        assert!(ctrl.set_tilt(f64::NAN).await.is_err());

        assert_eq!(pose(&ctrl).await, (90.0, 90.0));
        assert!(pins.history().is_empty());

        ctrl.set_pan(0.0).await.unwrap();
        ctrl.set_tilt(180.0).await.unwrap();
        assert_eq!(pose(&ctrl).await, (0.0, 180.0));
        assert_eq!(pins.pulse(PAN), Some(500));
        assert_eq!(pins.pulse(TILT), Some(2500));
    }

    #[tokio::test]
    async fn test_set_idempotent() {
        let (ctrl, pins) = servos();

        ctrl.set_pan(45.0).await.unwrap();
        ctrl.set_tilt(120.0).await.unwrap();
        let first = (pose(&ctrl).await, pins.pulse(PAN), pins.pulse(TILT));

        ctrl.set_pan(45.0).await.unwrap();
        ctrl.set_tilt(120.0).await.unwrap();
        let second = (pose(&ctrl).await, pins.pulse(PAN), pins.pulse(TILT));

        assert_eq!(first, ((45.0, 120.0), Some(1000), Some(1833)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_set_angles_partial() {
        let (ctrl, _pins) = servos();

        assert!(ctrl.set_angles(30.0, 200.0).await.is_err());
        assert_eq!(pose(&ctrl).await, (30.0, 90.0));
    }

    #[tokio::test]
    async fn test_move_saturates() {
        let (ctrl, _pins) = servos();

        ctrl.move_pan(PanDirection::Left, 85.0).await.unwrap();
        assert_eq!(pose(&ctrl).await.0, 175.0);
        ctrl.move_pan(PanDirection::Left, 10.0).await.unwrap();
        assert_eq!(pose(&ctrl).await.0, 180.0);
        ctrl.move_pan(PanDirection::Right, 200.0).await.unwrap();
        assert_eq!(pose(&ctrl).await.0, 0.0);

        // Up reduces the tilt angle
        ctrl.move_tilt(TiltDirection::Up, 5.0).await.unwrap();
        assert_eq!(pose(&ctrl).await.1, 85.0);
        ctrl.move_tilt(TiltDirection::Down, 500.0).await.unwrap();
        assert_eq!(pose(&ctrl).await.1, 180.0);

        assert!(ctrl.move_tilt(TiltDirection::Down, f64::NAN).await.is_err());
        assert_eq!(pose(&ctrl).await.1, 180.0);
    }

    #[tokio::test]
    async fn test_presets() {
        let (ctrl, pins) = servos();

        ctrl.apply_preset("left").await.unwrap();
        assert_eq!(pose(&ctrl).await, (135.0, 90.0));
        ctrl.apply_preset("down").await.unwrap();
        assert_eq!(pose(&ctrl).await, (90.0, 135.0));
        ctrl.apply_preset("front").await.unwrap();
        assert_eq!(pose(&ctrl).await, (90.0, 45.0));

        pins.clear_history();
        assert!(matches!(
            ctrl.apply_preset("sideways").await,
            Err(ServoError::UnknownPreset(_))
        ));
        assert_eq!(pose(&ctrl).await, (90.0, 45.0));
        assert!(pins.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_smooth_move() {
        let (ctrl, pins) = servos();
        pins.clear_history();

        ctrl.smooth_move(0.0, 180.0, 4, Duration::from_millis(20)).await.unwrap();

        assert_eq!(pose(&ctrl).await, (0.0, 180.0));
        assert_eq!(pins.history(), vec![
            PinWrite::Pulse { pin: PAN, width_us: 1250 },
            PinWrite::Pulse { pin: TILT, width_us: 1750 },
            PinWrite::Pulse { pin: PAN, width_us: 1000 },
            PinWrite::Pulse { pin: TILT, width_us: 2000 },
            PinWrite::Pulse { pin: PAN, width_us: 750 },
            PinWrite::Pulse { pin: TILT, width_us: 2250 },
            PinWrite::Pulse { pin: PAN, width_us: 500 },
            PinWrite::Pulse { pin: TILT, width_us: 2500 },
        ]);
    }

    #[tokio::test]
    async fn test_smooth_move_zero_steps() {
        let (ctrl, pins) = servos();
        pins.clear_history();

        ctrl.smooth_move(10.0, 20.0, 0, Duration::from_secs(10)).await.unwrap();
        assert_eq!(pose(&ctrl).await, (10.0, 20.0));
        assert_eq!(pins.history().len(), 2);

        // Targets are checked before anything moves
        assert!(ctrl.smooth_move(10.0, 190.0, 5, Duration::ZERO).await.is_err());
        assert_eq!(pose(&ctrl).await, (10.0, 20.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_smooth_move_excludes_readers() {
        let (ctrl, _pins) = servos();
        let ctrl = Arc::new(ctrl);

        let mover = ctrl.clone();
        let handle = tokio::spawn(async move {
            mover.smooth_move(0.0, 0.0, 10, Duration::from_millis(100)).await
        });

        // Let the move take the lock
        tokio::task::yield_now().await;

        // The status read waits until the move has finished
        assert_eq!(pose(&ctrl).await, (0.0, 0.0));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_handle_command() {
        let (ctrl, _pins) = servos();

        ctrl.handle_command(&ServoCmd::SetPan { angle: 10.0 }).await.unwrap();
        ctrl.handle_command(&ServoCmd::Pan { direction: PanDirection::Left, step: 5.0 })
            .await.unwrap();
        assert_eq!(pose(&ctrl).await.0, 15.0);

        ctrl.handle_command(&ServoCmd::Center).await.unwrap();
        assert_eq!(pose(&ctrl).await, (90.0, 90.0));

        assert!(matches!(
            ctrl.handle_command(&ServoCmd::Smooth {
                pan: 0.0, tilt: 0.0, steps: 2, delay_s: -1.0
            }).await,
            Err(ServoError::InvalidDelay(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup() {
        let (ctrl, pins) = servos();
        ctrl.set_angles(10.0, 170.0).await.unwrap();
        pins.clear_history();

        ctrl.cleanup().await.unwrap();
        assert_eq!(pins.history(), vec![
            PinWrite::Pulse { pin: PAN, width_us: 1500 },
            PinWrite::Pulse { pin: TILT, width_us: 1500 },
            PinWrite::Pulse { pin: PAN, width_us: 0 },
            PinWrite::Pulse { pin: TILT, width_us: 0 },
        ]);

        // Idempotent
        ctrl.cleanup().await.unwrap();
        assert_eq!(pins.pulse(PAN), Some(0));
        assert_eq!(pose(&ctrl).await, (90.0, 90.0));
    }
}
