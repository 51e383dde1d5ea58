//! # Pump Control Module
//!
//! Runs the sampling pumps for timed intervals. Each activation switches the pump's relay on and
//! spawns a timer task which switches it off again.
//!
//! Overlapping activations of the same pump restart its timer: the relay stays on and turns off
//! `duration` after the latest activation. Pumps are fully independent of each other.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, sync::Arc, time::Duration};

use comms_if::eqpt::gps::Position;
use log::{info, warn};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::hal::{HalError, RelayOutput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct PumpCtrl {
    pins: Vec<u8>,
    active_low: bool,
    inner: Arc<Mutex<PumpState>>,
}

struct PumpState {
    relay: Box<dyn RelayOutput>,

    /// Pending off-timers by pump id
    timers: HashMap<usize, PumpTimer>,

    /// Incremented for every activation so a timer can tell if it has been superseded
    generation: u64,
}

struct PumpTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error("Invalid pump ID {id}, expected 1 to {count}")]
    InvalidPumpId { id: i64, count: usize },

    #[error("Invalid pump duration {0}s")]
    InvalidDuration(f64),

    #[error(transparent)]
    Hal(#[from] HalError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PumpCtrl {
    /// Create a new controller for the pumps on `pins`, pump `n` being on `pins[n - 1]`.
    ///
    /// The relays are expected to already be off, see [`crate::hal::relay_output`].
    pub fn new(relay: Box<dyn RelayOutput>, pins: Vec<u8>, active_low: bool) -> Self {
        Self {
            pins,
            active_low,
            inner: Arc::new(Mutex::new(PumpState {
                relay,
                timers: HashMap::new(),
                generation: 0,
            })),
        }
    }

    pub fn pump_count(&self) -> usize {
        self.pins.len()
    }

    /// Run `pump_id` for `duration_s` seconds.
    ///
    /// The relay is switched on before this returns. Invalid ids or durations are rejected
    /// without touching any relay.
    pub async fn activate(
        &self,
        pump_id: i64,
        duration_s: f64,
        location: Option<Position>
    ) -> Result<(), PumpError> {
        let id = self.check_id(pump_id)?;
        let duration = Duration::try_from_secs_f64(duration_s)
            .map_err(|_| PumpError::InvalidDuration(duration_s))?;
        let pin = self.pins[id - 1];

        let mut state = self.inner.lock().await;

        state.relay.write(pin, !self.active_low)?;

        // Restart: the newest activation owns the relay
        if let Some(old) = state.timers.remove(&id) {
            old.handle.abort();
        }

        state.generation += 1;
        let generation = state.generation;

        let inner = self.inner.clone();
        let off_level = self.active_low;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;

            let mut state = inner.lock().await;

            // An aborted timer may still have reached this point
            match state.timers.get(&id) {
                Some(t) if t.generation == generation => (),
                _ => return,
            }
            state.timers.remove(&id);

            match state.relay.write(pin, off_level) {
                Ok(()) => info!("Pump {} deactivated", id),
                Err(e) => warn!("Could not deactivate pump {}: {}", id, e),
            }
        });

        state.timers.insert(id, PumpTimer { generation, handle });

        match location {
            Some(p) => info!(
                "Pump {} activated for {}s at ({:.6}, {:.6})", id, duration_s, p.lat, p.lon
            ),
            None => info!("Pump {} activated for {}s (no location)", id, duration_s),
        }

        Ok(())
    }

    /// Returns true if the pump has a pending off-timer.
    pub async fn is_active(&self, pump_id: i64) -> bool {
        match self.check_id(pump_id) {
            Ok(id) => self.inner.lock().await.timers.contains_key(&id),
            Err(_) => false,
        }
    }

    /// Cancel every pending timer and switch every pump off.
    pub async fn cleanup(&self) -> Result<(), PumpError> {
        let mut state = self.inner.lock().await;

        for (_, timer) in state.timers.drain() {
            timer.handle.abort();
        }

        let mut result = Ok(());
        for &pin in &self.pins {
            if let Err(e) = state.relay.write(pin, self.active_low) {
                warn!("Could not switch off pump on GPIO{}: {}", pin, e);
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
        }

        info!("All pumps off");

        result
    }

    fn check_id(&self, pump_id: i64) -> Result<usize, PumpError> {
        if pump_id >= 1 && (pump_id as u64) <= self.pins.len() as u64 {
            Ok(pump_id as usize)
        }
        else {
            Err(PumpError::InvalidPumpId { id: pump_id, count: self.pins.len() })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::SimPins;

    const PINS: [u8; 3] = [5, 6, 26];

    fn pumps() -> (PumpCtrl, SimPins) {
        let sim = SimPins::new();
        let relay = crate::hal::relay_output(
            crate::params::Backend::Sim, &PINS, true, &sim
        ).unwrap();
        sim.clear_history();

        (PumpCtrl::new(relay, PINS.to_vec(), true), sim)
    }

    /// Let spawned timers run up to the current virtual time
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_times_out() {
        let (pumps, pins) = pumps();

        pumps.activate(1, 2.0, None).await.unwrap();
        assert_eq!(pins.level(5), Some(false));
        assert!(pumps.is_active(1).await);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        settle().await;
        assert_eq!(pins.level(5), Some(false));

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(pins.level(5), Some(true));
        assert!(!pumps.is_active(1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_no_write() {
        let (pumps, pins) = pumps();

        assert!(matches!(
            pumps.activate(0, 1.0, None).await,
            Err(PumpError::InvalidPumpId { id: 0, count: 3 })
        ));
        assert!(pumps.activate(4, 1.0, None).await.is_err());
        assert!(pumps.activate(-1, 1.0, None).await.is_err());
        assert!(matches!(
            pumps.activate(1, -1.0, None).await,
            Err(PumpError::InvalidDuration(_))
        ));
        assert!(pumps.activate(1, f64::NAN, None).await.is_err());
        assert!(pumps.activate(1, f64::INFINITY, None).await.is_err());

        assert!(pins.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlap_restarts_timer() {
        let (pumps, pins) = pumps();

        pumps.activate(2, 5.0, None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        // Second activation 3 s into a 5 s run, for 4 s
        pumps.activate(2, 4.0, None).await.unwrap();

        // The first timer would have fired here
        tokio::time::sleep(Duration::from_millis(2500)).await;
        settle().await;
        assert_eq!(pins.level(6), Some(false));

        // The relay turns off 4 s after the latest activation
        tokio::time::sleep(Duration::from_millis(1600)).await;
        settle().await;
        assert_eq!(pins.level(6), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pumps_independent() {
        let (pumps, pins) = pumps();

        pumps.activate(1, 1.0, None).await.unwrap();
        pumps.activate(3, 10.0, None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        settle().await;
        assert_eq!(pins.level(5), Some(true));
        assert_eq!(pins.level(26), Some(false));
        assert!(pumps.is_active(3).await);
        assert_eq!(pins.level(6), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration() {
        let (pumps, pins) = pumps();

        pumps.activate(1, 0.0, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(pins.level(5), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup() {
        let (pumps, pins) = pumps();

        pumps.activate(1, 60.0, None).await.unwrap();
        pumps.activate(2, 60.0, None).await.unwrap();

        pumps.cleanup().await.unwrap();
        for pin in PINS {
            assert_eq!(pins.level(pin), Some(true));
        }
        assert!(!pumps.is_active(1).await);

        // Aborted timers never write again
        pins.clear_history();
        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;
        assert!(pins.history().is_empty());

        // Idempotent
        pumps.cleanup().await.unwrap();
        for pin in PINS {
            assert_eq!(pins.level(pin), Some(true));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_high_relays() {
        let sim = SimPins::new();
        let pumps = PumpCtrl::new(Box::new(sim.clone()), vec![7], false);

        pumps.activate(1, 1.0, None).await.unwrap();
        assert_eq!(sim.level(7), Some(true));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        settle().await;
        assert_eq!(sim.level(7), Some(false));
    }
}
