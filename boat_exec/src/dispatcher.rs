//! # Command Dispatcher
//!
//! Executes telecommands received from observers and produces any reply owed to the sender.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::{
    eqpt::{gps::Position, sample::SamplesData},
    tc::{MotorCmd, SamplesCmd, ServoCmd, Tc},
    tm::{TelemetrySnapshot, Tm},
};
use log::{debug, info, warn};
use tokio::sync::watch;

use crate::{
    components::{lock, Components},
    sample_log::SampleExtras,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Dispatcher {
    components: Arc<Components>,

    /// Latest snapshot published by the telemetry loop
    telemetry: watch::Receiver<Option<TelemetrySnapshot>>,

    /// Pump run time used when a pump command gives none.
    ///
    /// Units: seconds
    default_pump_duration_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Dispatcher {
    pub fn new(
        components: Arc<Components>,
        telemetry: watch::Receiver<Option<TelemetrySnapshot>>,
        default_pump_duration_s: f64
    ) -> Self {
        Self {
            components,
            telemetry,
            default_pump_duration_s,
        }
    }

    /// Handle one raw message from an observer.
    ///
    /// Malformed messages are logged and dropped.
    pub async fn handle(&self, text: &str) -> Option<Tm> {
        match Tc::from_json(text) {
            Ok(tc) => self.exec(tc).await,
            Err(e) => {
                warn!("Dropping invalid TC: {}", e);
                None
            }
        }
    }

    /// Execute a telecommand, returning the reply for the sender if there is one.
    pub async fn exec(&self, tc: Tc) -> Option<Tm> {
        match tc {
            Tc::Control(cmd) => {
                self.control(cmd);
                None
            },
            Tc::Servo(cmd) => Some(self.servo(&cmd).await),
            Tc::Pump { pump_id, duration_s } => {
                self.pump(pump_id, duration_s.unwrap_or(self.default_pump_duration_s)).await;
                None
            },
            Tc::Samples(cmd) => Some(self.samples(cmd).await),
        }
    }

    fn control(&self, cmd: MotorCmd) {
        debug!("Motor command: {}", cmd.as_str());

        if let Err(e) = self.components.motors.handle_command(cmd) {
            warn!("Could not execute motor command {}: {}", cmd.as_str(), e);
        }
    }

    /// The current servo status is returned whether or not the command succeeded.
    async fn servo(&self, cmd: &ServoCmd) -> Tm {
        if let Err(e) = self.components.servos.handle_command(cmd).await {
            warn!("Servo command {:?} rejected: {}", cmd, e);
        }

        Tm::ServoStatus(self.components.servos.get_status().await)
    }

    async fn pump(&self, pump_id: i64, duration_s: f64) {
        let (position, battery_voltage) = self.latest_position();

        if let Err(e) = self.components.pumps.activate(pump_id, duration_s, position).await {
            warn!("Pump command rejected: {}", e);
            return;
        }

        let position = match position {
            Some(p) => p,
            None => {
                info!("No GPS fix, sample from pump {} not logged", pump_id);
                return;
            }
        };

        // Already validated against the pump count
        let pump = match u8::try_from(pump_id) {
            Ok(p) => p,
            Err(_) => return,
        };

        let components = self.components.clone();
        let logged = tokio::task::spawn_blocking(move || {
            let extras = SampleExtras { battery_voltage, ..Default::default() };
            lock(&components.samples).log_sample(pump, duration_s, position, &extras)
        }).await;

        match logged {
            Ok(Ok(_)) => (),
            Ok(Err(e)) => warn!("Could not log sample from pump {}: {}", pump_id, e),
            Err(e) => warn!("Sample logging task failed: {}", e),
        }
    }

    async fn samples(&self, cmd: SamplesCmd) -> Tm {
        let components = self.components.clone();

        let data = tokio::task::spawn_blocking(move || {
            let log = lock(&components.samples);

            match cmd {
                SamplesCmd::GetAll => SamplesData::AllSamples {
                    samples: log.get_samples(None).unwrap_or_else(|e| {
                        warn!("Could not read samples: {}", e);
                        Vec::new()
                    }),
                },
                SamplesCmd::GetStatistics => SamplesData::Statistics {
                    statistics: log.get_statistics().unwrap_or_else(|e| {
                        warn!("Could not compute sample statistics: {}", e);
                        Default::default()
                    }),
                },
                SamplesCmd::ExportGeojson => match log.export_geojson() {
                    Ok(path) => SamplesData::GeojsonExported {
                        message: format!("GeoJSON exported to {}", path.display()),
                        file: Some(path.display().to_string()),
                    },
                    Err(e) => {
                        warn!("GeoJSON export failed: {}", e);
                        SamplesData::GeojsonExported {
                            file: None,
                            message: format!("GeoJSON export failed: {}", e),
                        }
                    }
                },
                SamplesCmd::ExportCsv => match log.export_csv() {
                    Ok(path) => SamplesData::CsvExported {
                        message: format!("CSV exported to {}", path.display()),
                        file: Some(path.display().to_string()),
                    },
                    Err(e) => {
                        warn!("CSV export failed: {}", e);
                        SamplesData::CsvExported {
                            file: None,
                            message: format!("CSV export failed: {}", e),
                        }
                    }
                },
            }
        }).await;

        match data {
            Ok(d) => Tm::SamplesData(d),
            Err(e) => {
                warn!("Samples task failed: {}", e);
                Tm::SamplesData(match cmd {
                    SamplesCmd::GetAll => SamplesData::AllSamples { samples: Vec::new() },
                    SamplesCmd::GetStatistics => SamplesData::Statistics {
                        statistics: Default::default()
                    },
                    SamplesCmd::ExportGeojson => SamplesData::GeojsonExported {
                        file: None,
                        message: format!("GeoJSON export failed: {}", e),
                    },
                    SamplesCmd::ExportCsv => SamplesData::CsvExported {
                        file: None,
                        message: format!("CSV export failed: {}", e),
                    },
                })
            }
        }
    }

    /// Position of the latest valid fix and battery voltage from the telemetry cache.
    fn latest_position(&self) -> (Option<Position>, Option<f64>) {
        match &*self.telemetry.borrow() {
            Some(s) => (
                s.gps.as_ref().and_then(|f| f.position()),
                s.battery.map(|b| b.voltage),
            ),
            None => (None, None),
        }
    }
}
