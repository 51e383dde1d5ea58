//! # Sample Log
//!
//! Persistent record of every water sample collected. Each sample is appended to a CSV log and
//! to a JSON document; the JSON document is the source for queries and exports.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io::BufReader,
    path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use comms_if::eqpt::{
    gps::Position,
    sample::{
        DateRange, SampleEnvironment, SampleLocation, SampleRecord, SampleStatistics,
        SampleSystem,
    },
};
use csv::WriterBuilder;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::params::DataLoggingParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const DOCUMENT_VERSION: &str = "1.0";

const BOAT_ID: &str = "aquabot-001";

const STATUS_COLLECTED: &str = "collected";

/// Columns of the append-only CSV log.
const LOG_HEADER: [&str; 12] = [
    "timestamp", "sample_id", "pump_id", "duration", "latitude", "longitude", "altitude", "notes",
    "water_temp", "air_temp", "battery_voltage", "weather_conditions",
];

/// Columns of a CSV export.
const EXPORT_HEADER: [&str; 13] = [
    "Sample ID", "Timestamp", "Pump ID", "Duration (s)", "Latitude", "Longitude", "Altitude (m)",
    "Water Temp (°C)", "Air Temp (°C)", "Battery (V)", "Weather", "Notes", "Status",
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SampleLog {
    csv_file: PathBuf,
    json_file: PathBuf,
    samples_dir: PathBuf,
}

/// Optional data recorded alongside a sample.
#[derive(Debug, Clone, Default)]
pub struct SampleExtras {
    pub notes: String,
    pub water_temperature: Option<f64>,
    pub air_temperature: Option<f64>,
    pub battery_voltage: Option<f64>,
    pub weather_conditions: String,
}

/// Layout of the JSON sample document.
#[derive(Serialize, Deserialize)]
struct SampleDocument {
    metadata: DocumentMetadata,
    samples: Vec<SampleRecord>,
}

#[derive(Serialize, Deserialize)]
struct DocumentMetadata {
    created: String,
    version: String,
    boat_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,

    #[serde(default)]
    total_samples: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SampleLogError {
    #[error("Sample log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sample CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Sample JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SampleLog {
    /// Open the sample log, creating the files and export directory if they don't exist.
    pub fn new(params: &DataLoggingParams) -> Result<Self, SampleLogError> {
        let log = Self {
            csv_file: PathBuf::from(&params.csv_file),
            json_file: PathBuf::from(&params.json_file),
            samples_dir: PathBuf::from(&params.samples_dir),
        };

        fs::create_dir_all(&log.samples_dir)?;
        create_parent(&log.csv_file)?;
        create_parent(&log.json_file)?;

        if !log.csv_file.exists() {
            let mut w = WriterBuilder::new().from_path(&log.csv_file)?;
            w.write_record(LOG_HEADER)?;
            w.flush()?;
        }

        if !log.json_file.exists() {
            log.write_document(&SampleDocument {
                metadata: DocumentMetadata {
                    created: now_rfc3339(),
                    version: DOCUMENT_VERSION.into(),
                    boat_id: BOAT_ID.into(),
                    last_updated: None,
                    total_samples: 0,
                },
                samples: Vec::new(),
            })?;
        }

        info!("Sample log opened ({:?}, {:?})", log.csv_file, log.json_file);

        Ok(log)
    }

    /// Record a new sample, returning its ID.
    pub fn log_sample(
        &mut self,
        pump_id: u8,
        duration_s: f64,
        location: Position,
        extras: &SampleExtras
    ) -> Result<String, SampleLogError> {
        let sample_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let timestamp = now_rfc3339();

        let record = SampleRecord {
            sample_id: sample_id.clone(),
            timestamp: timestamp.clone(),
            pump_id,
            duration: duration_s,
            location: SampleLocation {
                latitude: Some(location.lat),
                longitude: Some(location.lon),
                altitude: Some(location.alt),
            },
            environmental: SampleEnvironment {
                water_temperature: extras.water_temperature,
                air_temperature: extras.air_temperature,
                weather_conditions: extras.weather_conditions.clone(),
            },
            system: SampleSystem {
                battery_voltage: extras.battery_voltage,
            },
            notes: extras.notes.clone(),
            status: STATUS_COLLECTED.into(),
        };

        // Append to the CSV log
        let file = OpenOptions::new().append(true).open(&self.csv_file)?;
        let mut w = WriterBuilder::new().has_headers(false).from_writer(file);
        w.write_record([
            record.timestamp.clone(),
            record.sample_id.clone(),
            record.pump_id.to_string(),
            record.duration.to_string(),
            opt(record.location.latitude),
            opt(record.location.longitude),
            opt(record.location.altitude),
            record.notes.clone(),
            opt(record.environmental.water_temperature),
            opt(record.environmental.air_temperature),
            opt(record.system.battery_voltage),
            record.environmental.weather_conditions.clone(),
        ])?;
        w.flush()?;

        // Add to the JSON document
        let mut doc = self.read_document()?;
        doc.samples.push(record);
        doc.metadata.last_updated = Some(timestamp);
        doc.metadata.total_samples = doc.samples.len();
        self.write_document(&doc)?;

        info!(
            "Logged sample {} from pump {} at ({:.6}, {:.6})",
            sample_id, pump_id, location.lat, location.lon
        );

        Ok(sample_id)
    }

    /// All samples in collection order, or only the most recent `limit`.
    pub fn get_samples(&self, limit: Option<usize>) -> Result<Vec<SampleRecord>, SampleLogError> {
        let mut samples = self.read_document()?.samples;

        if let Some(n) = limit {
            let skip = samples.len().saturating_sub(n);
            samples.drain(..skip);
        }

        Ok(samples)
    }

    /// Export every sample as a CSV file in the samples directory.
    pub fn export_csv(&self) -> Result<PathBuf, SampleLogError> {
        let path = self.export_path("water_samples_export", "csv");
        let samples = self.get_samples(None)?;

        let mut w = WriterBuilder::new().from_path(&path)?;
        w.write_record(EXPORT_HEADER)?;

        for s in &samples {
            w.write_record([
                s.sample_id.clone(),
                s.timestamp.clone(),
                s.pump_id.to_string(),
                s.duration.to_string(),
                opt(s.location.latitude),
                opt(s.location.longitude),
                opt(s.location.altitude),
                opt(s.environmental.water_temperature),
                opt(s.environmental.air_temperature),
                opt(s.system.battery_voltage),
                s.environmental.weather_conditions.clone(),
                s.notes.clone(),
                s.status.clone(),
            ])?;
        }
        w.flush()?;

        info!("Exported {} samples to {:?}", samples.len(), path);

        Ok(path)
    }

    /// Export every located sample as a GeoJSON feature collection of points.
    pub fn export_geojson(&self) -> Result<PathBuf, SampleLogError> {
        let path = self.export_path("water_samples_map", "geojson");

        let features: Vec<_> = self.get_samples(None)?
            .into_iter()
            .filter_map(|s| {
                let lat = s.location.latitude?;
                let lon = s.location.longitude?;

                Some(json!({
                    "type": "Feature",
                    "properties": {
                        "sample_id": s.sample_id,
                        "timestamp": s.timestamp,
                        "pump_id": s.pump_id,
                        "duration": s.duration,
                        "water_temp": s.environmental.water_temperature,
                        "air_temp": s.environmental.air_temperature,
                        "weather": s.environmental.weather_conditions,
                        "notes": s.notes,
                        "status": s.status
                    },
                    "geometry": {
                        "type": "Point",
                        "coordinates": [lon, lat, s.location.altitude.unwrap_or(0.0)]
                    }
                }))
            })
            .collect();

        let geojson = json!({
            "type": "FeatureCollection",
            "metadata": {
                "generated": now_rfc3339(),
                "total_samples": features.len()
            },
            "features": features
        });

        fs::write(&path, serde_json::to_string_pretty(&geojson)?)?;

        info!("Exported GeoJSON map to {:?}", path);

        Ok(path)
    }

    pub fn get_statistics(&self) -> Result<SampleStatistics, SampleLogError> {
        Ok(statistics(&self.get_samples(None)?))
    }

    fn read_document(&self) -> Result<SampleDocument, SampleLogError> {
        let file = File::open(&self.json_file)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn write_document(&self, doc: &SampleDocument) -> Result<(), SampleLogError> {
        fs::write(&self.json_file, serde_json::to_string_pretty(doc)?)?;
        Ok(())
    }

    fn export_path(&self, prefix: &str, extension: &str) -> PathBuf {
        self.samples_dir.join(format!(
            "{}_{}.{}",
            prefix,
            Local::now().format(util::session::TIMESTAMP_FORMAT),
            extension
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Count samples by pump and by day, and find the first and last collection times.
pub fn statistics(samples: &[SampleRecord]) -> SampleStatistics {
    if samples.is_empty() {
        return SampleStatistics::default();
    }

    let mut by_pump = BTreeMap::new();
    let mut by_date = BTreeMap::new();

    for s in samples {
        *by_pump.entry(s.pump_id.to_string()).or_insert(0) += 1;

        if let Some(date) = s.timestamp.get(..10) {
            *by_date.entry(date.to_string()).or_insert(0) += 1;
        }
    }

    let times: Vec<DateTime<FixedOffset>> = samples.iter()
        .filter_map(|s| DateTime::parse_from_rfc3339(&s.timestamp).ok())
        .collect();

    let date_range = match (times.iter().min(), times.iter().max()) {
        (Some(first), Some(last)) => Some(DateRange {
            first: first.to_rfc3339(),
            last: last.to_rfc3339(),
        }),
        _ => None,
    };

    SampleStatistics {
        total: samples.len(),
        by_pump,
        by_date,
        date_range,
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => fs::create_dir_all(p),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::Value;

    fn open(dir: &Path) -> SampleLog {
        SampleLog::new(&DataLoggingParams {
            csv_file: dir.join("log/water_samples.csv").to_string_lossy().into(),
            json_file: dir.join("log/water_samples.json").to_string_lossy().into(),
            samples_dir: dir.join("samples").to_string_lossy().into(),
        }).unwrap()
    }

    fn pos(lat: f64, lon: f64) -> Position {
        Position { lat, lon, alt: 1.5 }
    }

    fn record(pump_id: u8, timestamp: &str) -> SampleRecord {
        SampleRecord {
            sample_id: "00000000".into(),
            timestamp: timestamp.into(),
            pump_id,
            duration: 5.0,
            location: SampleLocation::default(),
            environmental: SampleEnvironment::default(),
            system: SampleSystem::default(),
            notes: String::new(),
            status: STATUS_COLLECTED.into(),
        }
    }

    #[test]
    fn test_new_creates_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(dir.path());

        assert!(dir.path().join("samples").is_dir());

        let csv = fs::read_to_string(dir.path().join("log/water_samples.csv")).unwrap();
        assert_eq!(csv.lines().next().unwrap(), LOG_HEADER.join(","));

        assert!(log.get_samples(None).unwrap().is_empty());

        // Reopening keeps existing files
        let mut log = open(dir.path());
        log.log_sample(1, 5.0, pos(51.0, -1.0), &SampleExtras::default()).unwrap();
        let log = open(dir.path());
        assert_eq!(log.get_samples(None).unwrap().len(), 1);
    }

    #[test]
    fn test_log_sample() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open(dir.path());

        let extras = SampleExtras { battery_voltage: Some(13.2), ..Default::default() };
        let id = log.log_sample(2, 4.0, pos(51.5, -0.12), &extras).unwrap();

        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        let samples = log.get_samples(None).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].sample_id, id);
        assert_eq!(samples[0].pump_id, 2);
        assert_eq!(samples[0].location.latitude, Some(51.5));
        assert_eq!(samples[0].location.longitude, Some(-0.12));
        assert_eq!(samples[0].system.battery_voltage, Some(13.2));
        assert_eq!(samples[0].status, "collected");
        assert!(DateTime::parse_from_rfc3339(&samples[0].timestamp).is_ok());

        // CSV log has a header plus one row
        let csv = fs::read_to_string(dir.path().join("log/water_samples.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().nth(1).unwrap().contains(&id));

        // Document metadata is kept up to date
        let doc: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("log/water_samples.json")).unwrap()
        ).unwrap();
        assert_eq!(doc["metadata"]["total_samples"], 1);
        assert_eq!(doc["metadata"]["boat_id"], "aquabot-001");
    }

    #[test]
    fn test_get_samples_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open(dir.path());

        for pump in 1..=3 {
            log.log_sample(pump, 1.0, pos(50.0, 0.0), &SampleExtras::default()).unwrap();
        }

        let last_two = log.get_samples(Some(2)).unwrap();
        assert_eq!(last_two.iter().map(|s| s.pump_id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(log.get_samples(Some(10)).unwrap().len(), 3);
    }

    #[test]
    fn test_exports() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = open(dir.path());

        log.log_sample(1, 5.0, pos(51.5, -0.12), &SampleExtras::default()).unwrap();
        log.log_sample(3, 2.0, pos(51.6, -0.13), &SampleExtras::default()).unwrap();

        let csv_path = log.export_csv().unwrap();
        assert!(csv_path.starts_with(dir.path().join("samples")));
        let name = csv_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("water_samples_export_") && name.ends_with(".csv"));
        let csv = fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("Sample ID,Timestamp,Pump ID"));

        let geo_path = log.export_geojson().unwrap();
        let name = geo_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("water_samples_map_") && name.ends_with(".geojson"));

        let geo: Value = serde_json::from_str(&fs::read_to_string(&geo_path).unwrap()).unwrap();
        assert_eq!(geo["type"], "FeatureCollection");
        assert_eq!(geo["metadata"]["total_samples"], 2);
        assert_eq!(geo["features"][0]["geometry"]["type"], "Point");
        assert_eq!(
            geo["features"][0]["geometry"]["coordinates"],
            serde_json::json!([-0.12, 51.5, 1.5])
        );
        assert_eq!(geo["features"][1]["properties"]["pump_id"], 3);
    }

    #[test]
    fn test_statistics() {
        assert_eq!(statistics(&[]), SampleStatistics::default());

        let stats = statistics(&[
            record(1, "2026-06-01T10:00:00.000000+00:00"),
            record(2, "2026-06-01T09:30:00.000000+00:00"),
            record(1, "2026-06-02T08:00:00.000000+00:00"),
        ]);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_pump.get("1"), Some(&2));
        assert_eq!(stats.by_pump.get("2"), Some(&1));
        assert_eq!(stats.by_date.get("2026-06-01"), Some(&2));
        assert_eq!(stats.by_date.get("2026-06-02"), Some(&1));

        let range = stats.date_range.unwrap();
        assert_eq!(range.first, "2026-06-01T09:30:00+00:00");
        assert_eq!(range.last, "2026-06-02T08:00:00+00:00");
    }

    #[test]
    fn test_empty_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(dir.path());

        let stats = log.get_statistics().unwrap();
        assert_eq!(serde_json::to_value(&stats).unwrap(), serde_json::json!({"total": 0}));
    }
}
