//! # GPS Module
//!
//! Reads fixes from an NMEA receiver on a serial line. The session owns the stream and
//! reconnects on I/O failures; it is blocking and is driven from the blocking thread pool.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod parser;
pub mod serial;
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::{BufRead, ErrorKind},
    time::Duration,
};

use comms_if::eqpt::gps::Fix;
use log::{info, warn};

use crate::params::GpsParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of lines scanned for a GGA sentence in one `read()`.
pub const MAX_LINES_PER_READ: usize = 10;

/// Read timeout on the serial line.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A line oriented byte stream from a GPS receiver.
pub type GpsStream = Box<dyn BufRead + Send>;

/// Opens the stream to the receiver.
pub trait SerialConnector: Send {
    fn open(&mut self, port: &str, baudrate: u32) -> Result<GpsStream, GpsError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct GpsSession {
    connector: Box<dyn SerialConnector>,
    port: String,
    baudrate: u32,
    settle: Duration,

    state: GpsState,
    stream: Option<GpsStream>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, thiserror::Error)]
pub enum GpsError {
    #[error("Could not open GPS port {port}: {msg}")]
    Open { port: String, msg: String },

    #[error("GPS stream closed")]
    StreamClosed,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GpsSession {
    /// Create a new session, which will connect on the first read.
    pub fn new(connector: Box<dyn SerialConnector>, params: &GpsParams) -> Self {
        Self {
            connector,
            port: params.port.clone(),
            baudrate: params.baudrate,
            settle: Duration::try_from_secs_f64(params.settle_s).unwrap_or_default(),
            state: GpsState::Disconnected,
            stream: None,
        }
    }

    pub fn state(&self) -> GpsState {
        self.state
    }

    /// Open the stream to the receiver, closing any existing stream first.
    ///
    /// Returns `true` if the stream is now connected.
    pub fn connect(&mut self) -> bool {
        self.stream = None;
        self.state = GpsState::Connecting;

        match self.connector.open(&self.port, self.baudrate) {
            Ok(stream) => {
                info!("GPS connected to {} at {} baud", self.port, self.baudrate);

                // Give the receiver time to start streaming
                if !self.settle.is_zero() {
                    std::thread::sleep(self.settle);
                }

                self.stream = Some(stream);
                self.state = GpsState::Connected;
                true
            },
            Err(e) => {
                warn!("GPS connection error: {}", e);
                self.state = GpsState::Disconnected;
                false
            }
        }
    }

    /// Read the next fix from the receiver.
    ///
    /// Returns `None` if the receiver could not be reached, or if no GGA sentence was found in
    /// the next [`MAX_LINES_PER_READ`] lines.
    pub fn read(&mut self) -> Option<Fix> {
        if self.stream.is_none() && !self.connect() {
            return None;
        }

        match self.scan() {
            Ok(fix) => fix,
            Err(e) => {
                warn!("GPS read error: {}, reconnecting", e);
                self.connect();
                None
            }
        }
    }

    /// Close the stream. Has no effect if already closed.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("GPS port {} closed", self.port);
        }
        self.state = GpsState::Disconnected;
    }

    fn scan(&mut self) -> Result<Option<Fix>, std::io::Error> {
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return Ok(None),
        };

        let mut buf = Vec::new();

        for _ in 0..MAX_LINES_PER_READ {
            buf.clear();

            match stream.read_until(b'\n', &mut buf) {
                Ok(0) => return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    GpsError::StreamClosed
                )),
                Ok(_) => (),
                // A timeout counts as an empty line
                Err(e) if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) => continue,
                Err(e) => return Err(e),
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();

            if parser::is_gga(line) {
                return Ok(Some(parser::parse_gga(line)));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        collections::VecDeque,
        io::{self, BufReader, Read},
        sync::{Arc, Mutex},
    };

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";

    /// One scripted read result
    enum Chunk {
        Data(&'static str),
        Timeout,
        Fail,
    }

    struct ScriptedUart {
        chunks: VecDeque<Chunk>,
    }

    impl Read for ScriptedUart {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Chunk::Data(s)) => {
                    // Chunks are always shorter than the BufReader's buffer
                    buf[..s.len()].copy_from_slice(s.as_bytes());
                    Ok(s.len())
                },
                Some(Chunk::Timeout) => Err(io::Error::new(ErrorKind::TimedOut, "timeout")),
                Some(Chunk::Fail) => Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged")),
                None => Ok(0),
            }
        }
    }

    /// Hands out scripted streams in order, failing once they run out
    #[derive(Clone)]
    struct MockConnector {
        scripts: Arc<Mutex<VecDeque<Vec<Chunk>>>>,
        opens: Arc<Mutex<usize>>,
    }

    impl MockConnector {
        fn new(scripts: Vec<Vec<Chunk>>) -> Self {
            Self {
                scripts: Arc::new(Mutex::new(scripts.into_iter().collect())),
                opens: Arc::new(Mutex::new(0)),
            }
        }

        fn opens(&self) -> usize {
            *self.opens.lock().unwrap()
        }
    }

    impl SerialConnector for MockConnector {
        fn open(&mut self, port: &str, _baudrate: u32) -> Result<GpsStream, GpsError> {
            *self.opens.lock().unwrap() += 1;

            match self.scripts.lock().unwrap().pop_front() {
                Some(chunks) => Ok(Box::new(BufReader::new(ScriptedUart {
                    chunks: chunks.into_iter().collect()
                }))),
                None => Err(GpsError::Open { port: port.into(), msg: "no such device".into() })
            }
        }
    }

    fn session(connector: &MockConnector) -> GpsSession {
        GpsSession::new(
            Box::new(connector.clone()),
            &GpsParams { port: "/dev/mock".into(), baudrate: 9600, settle_s: 0.0 }
        )
    }

    #[test]
    fn test_read_fix() {
        let conn = MockConnector::new(vec![vec![Chunk::Data(RMC), Chunk::Data(GGA)]]);
        let mut gps = session(&conn);

        assert_eq!(gps.state(), GpsState::Disconnected);

        let fix = gps.read().unwrap();
        assert!(fix.fix);
        assert_eq!(fix.satellites, 8);
        assert_eq!(gps.state(), GpsState::Connected);
        assert_eq!(conn.opens(), 1);
    }

    #[test]
    fn test_connect_failure() {
        let conn = MockConnector::new(vec![]);
        let mut gps = session(&conn);

        assert!(!gps.connect());
        assert_eq!(gps.state(), GpsState::Disconnected);

        // Reads retry the connection each time
        assert!(gps.read().is_none());
        assert!(gps.read().is_none());
        assert_eq!(conn.opens(), 3);
    }

    #[test]
    fn test_no_gga_within_limit() {
        let mut chunks: Vec<Chunk> = (0..MAX_LINES_PER_READ).map(|_| Chunk::Data(RMC)).collect();
        chunks.push(Chunk::Data(GGA));

        let conn = MockConnector::new(vec![chunks]);
        let mut gps = session(&conn);

        // The GGA sentence is the 11th line, so is not reached by the first read
        assert!(gps.read().is_none());
        assert_eq!(gps.state(), GpsState::Connected);

        // But is found by the next one
        assert!(gps.read().unwrap().fix);
    }

    #[test]
    fn test_timeouts_count_as_lines() {
        let mut chunks: Vec<Chunk> = (0..MAX_LINES_PER_READ).map(|_| Chunk::Timeout).collect();
        chunks.push(Chunk::Data(GGA));

        let conn = MockConnector::new(vec![chunks]);
        let mut gps = session(&conn);

        assert!(gps.read().is_none());
        assert_eq!(gps.state(), GpsState::Connected);
        assert_eq!(conn.opens(), 1);
        assert!(gps.read().is_some());
    }

    #[test]
    fn test_no_fix_sentence_is_returned() {
        let conn = MockConnector::new(vec![vec![Chunk::Data(
            "$GPGGA,123519,,,,,0,00,,,M,,M,,*66\r\n"
        )]]);
        let mut gps = session(&conn);

        assert_eq!(gps.read(), Some(Fix::no_fix()));
    }

    #[test]
    fn test_io_error_reconnects() {
        let conn = MockConnector::new(vec![
            vec![Chunk::Fail],
            vec![Chunk::Data(GGA)],
        ]);
        let mut gps = session(&conn);

        assert!(gps.read().is_none());
        assert_eq!(conn.opens(), 2);
        assert_eq!(gps.state(), GpsState::Connected);

        assert!(gps.read().unwrap().fix);
    }

    #[test]
    fn test_close() {
        let conn = MockConnector::new(vec![vec![Chunk::Data(GGA)]]);
        let mut gps = session(&conn);

        assert!(gps.connect());
        gps.close();
        assert_eq!(gps.state(), GpsState::Disconnected);

        // Idempotent
        gps.close();
        assert_eq!(gps.state(), GpsState::Disconnected);
    }
}
