//! Simulated receiver
//!
//! Produces a byte-for-byte valid NMEA stream of a boat drifting slowly north-east from a fixed
//! origin, interleaving RMC sentences so the session's line scanning is exercised.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io::{self, BufReader, Read};

use chrono::Utc;

use super::{
    parser::{format_coordinate, format_sentence},
    GpsError, GpsStream, SerialConnector,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Drift applied to both coordinates per emitted fix.
///
/// Units: degrees
const DRIFT_DEG: f64 = 0.000_01;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SimGpsConnector {
    /// Starting position in degrees
    pub origin: (f64, f64),

    /// Units: metres
    pub altitude: f64,

    pub satellites: u32,
}

/// An endless simulated NMEA stream.
pub struct SimNmeaStream {
    config: SimGpsConnector,
    fixes: u64,
    pending: Vec<u8>,
    cursor: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimGpsConnector {
    fn default() -> Self {
        Self {
            origin: (51.5072, -0.1276),
            altitude: 11.0,
            satellites: 9,
        }
    }
}

impl SerialConnector for SimGpsConnector {
    fn open(&mut self, _port: &str, _baudrate: u32) -> Result<GpsStream, GpsError> {
        Ok(Box::new(BufReader::new(SimNmeaStream::new(*self))))
    }
}

impl SimNmeaStream {
    pub fn new(config: SimGpsConnector) -> Self {
        Self {
            config,
            fixes: 0,
            pending: Vec::new(),
            cursor: 0,
        }
    }

    /// Generate the next pair of sentences.
    fn refill(&mut self) {
        let lat = self.config.origin.0 + DRIFT_DEG * self.fixes as f64;
        let lon = self.config.origin.1 + DRIFT_DEG * self.fixes as f64;
        self.fixes += 1;

        let time = Utc::now().format("%H%M%S%.3f");
        let (lat_str, lat_hemi) = format_coordinate(lat, 2, 'N', 'S');
        let (lon_str, lon_hemi) = format_coordinate(lon, 3, 'E', 'W');

        let gga = format!(
            "GPGGA,{},{},{},{},{},1,{:02},0.9,{:.1},M,47.0,M,,",
            time, lat_str, lat_hemi, lon_str, lon_hemi, self.config.satellites, self.config.altitude
        );
        let rmc = format!(
            "GPRMC,{},A,{},{},{},{},0.5,45.0,{},,,A",
            time, lat_str, lat_hemi, lon_str, lon_hemi, Utc::now().format("%d%m%y")
        );

        self.pending = format!("{}{}", format_sentence(&rmc), format_sentence(&gga)).into_bytes();
        self.cursor = 0;
    }
}

impl Read for SimNmeaStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cursor >= self.pending.len() {
            self.refill();
        }

        let n = buf.len().min(self.pending.len() - self.cursor);
        buf[..n].copy_from_slice(&self.pending[self.cursor..self.cursor + n]);
        self.cursor += n;

        Ok(n)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{gps::GpsSession, params::GpsParams};

    #[test]
    fn test_sim_stream_gives_fixes() {
        let mut gps = GpsSession::new(
            Box::new(SimGpsConnector::default()),
            &GpsParams { port: "sim".into(), baudrate: 9600, settle_s: 0.0 }
        );

        let first = gps.read().unwrap();
        assert!(first.fix);
        assert_eq!(first.satellites, 9);
        assert_eq!(first.alt, 11.0);
        assert!((first.lat - 51.5072).abs() < 1e-5);
        assert!((first.lon + 0.1276).abs() < 1e-5);

        // The boat drifts between fixes
        let second = gps.read().unwrap();
        assert!(second.lat > first.lat);
    }
}
