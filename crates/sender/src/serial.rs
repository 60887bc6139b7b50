//! Porta serial real via `serialport` (8N1, sem controle de fluxo).

use crate::link::{OpenError, SerialConnector, SerialLine, SerialSettings};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use telemetry_core::protocol::SERIAL_LINE_TERMINATOR;

/// Maior resposta aceita do dispositivo em uma leitura.
const MAX_REPLY_LEN: usize = 1024;

/// Conector para as portas do sistema (`COM3`, `/dev/ttyACM0`…).
pub struct SystemSerial;

impl SerialConnector for SystemSerial {
    type Line = SerialPortLine;

    fn open(&mut self, port_name: &str, settings: &SerialSettings) -> Result<SerialPortLine, OpenError> {
        serialport::new(port_name, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.timeout)
            .open()
            .map(|port| SerialPortLine { port })
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice
                | serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
                    OpenError::DeviceAbsent(port_name.to_string())
                }
                _ => OpenError::Other(e.to_string()),
            })
    }
}

/// Nomes das portas seriais visíveis no sistema (para diagnóstico).
pub fn available_port_names() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}

/// Porta aberta.
pub struct SerialPortLine {
    port: Box<dyn SerialPort>,
}

impl SerialLine for SerialPortLine {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut frame = String::with_capacity(line.len() + 1);
        frame.push_str(line);
        frame.push(SERIAL_LINE_TERMINATOR);
        self.port.write_all(frame.as_bytes())?;
        self.port.flush()
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.port.bytes_to_read()?)
    }

    /// Lê até `\n` (o `\r` final é descartado) ou até o timeout da porta.
    fn read_line(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        while buf.len() < MAX_REPLY_LEN {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => buf.push(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }
        Ok(String::from_utf8_lossy(&buf)
            .trim_end_matches('\r')
            .to_string())
    }

    fn close(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}
