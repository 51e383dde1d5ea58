//! Serial port connector for a real receiver

use std::io::BufReader;

use serialport::{DataBits, FlowControl, Parity, StopBits};

use super::{GpsError, GpsStream, SerialConnector, READ_TIMEOUT};

/// Opens the receiver's UART with 8N1 framing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortConnector;

impl SerialConnector for SerialPortConnector {
    fn open(&mut self, port: &str, baudrate: u32) -> Result<GpsStream, GpsError> {
        let serial = serialport::new(port, baudrate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| GpsError::Open { port: port.into(), msg: e.to_string() })?;

        Ok(Box::new(BufReader::new(serial)))
    }
}
