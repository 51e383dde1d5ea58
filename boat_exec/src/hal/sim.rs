//! Simulated pins
//!
//! `SimPins` is cheap to clone, and every clone shares the same write log so a test can keep one
//! handle while the controllers own the others.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{HalError, PulseOutput, RelayOutput};

/// A single recorded pin write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    Pulse { pin: u8, width_us: u32 },
    Level { pin: u8, high: bool },
}

#[derive(Debug, Clone, Default)]
pub struct SimPins {
    inner: Arc<Mutex<SimPinsInner>>,
}

#[derive(Debug, Default)]
struct SimPinsInner {
    history: Vec<PinWrite>,
    pulses: HashMap<u8, u32>,
    levels: HashMap<u8, bool>,
}

impl SimPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write made so far, oldest first.
    pub fn history(&self) -> Vec<PinWrite> {
        self.lock().history.clone()
    }

    /// Latest pulse width written to `pin`.
    pub fn pulse(&self, pin: u8) -> Option<u32> {
        self.lock().pulses.get(&pin).copied()
    }

    /// Latest level written to `pin`.
    pub fn level(&self, pin: u8) -> Option<bool> {
        self.lock().levels.get(&pin).copied()
    }

    pub fn clear_history(&self) {
        self.lock().history.clear();
    }

    fn lock(&self) -> MutexGuard<'_, SimPinsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PulseOutput for SimPins {
    fn set_pulse_width(&mut self, pin: u8, width_us: u32) -> Result<(), HalError> {
        let mut inner = self.lock();
        inner.history.push(PinWrite::Pulse { pin, width_us });
        inner.pulses.insert(pin, width_us);
        Ok(())
    }
}

impl RelayOutput for SimPins {
    fn write(&mut self, pin: u8, high: bool) -> Result<(), HalError> {
        let mut inner = self.lock();
        inner.history.push(PinWrite::Level { pin, high });
        inner.levels.insert(pin, high);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clones_share_log() {
        let pins = SimPins::new();
        let mut writer = pins.clone();

        writer.set_pulse_width(12, 1500).unwrap();
        writer.write(5, false).unwrap();
        writer.set_pulse_width(12, 0).unwrap();

        assert_eq!(pins.pulse(12), Some(0));
        assert_eq!(pins.level(5), Some(false));
        assert_eq!(pins.history(), vec![
            PinWrite::Pulse { pin: 12, width_us: 1500 },
            PinWrite::Level { pin: 5, high: false },
            PinWrite::Pulse { pin: 12, width_us: 0 },
        ]);

        pins.clear_history();
        assert!(writer.history().is_empty());
    }
}
