//! Threads de entrada: linhas de telemetria (serial ou stdin) e comandos
//! de página, enviados para o loop principal via channel.

use crate::display::DisplayPage;
use crossbeam_channel::{bounded, Receiver, Sender};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use telemetry_core::protocol::SERIAL_LINE_TERMINATOR;
use tracing::{debug, info, warn};

/// Mensagem enviada das threads de entrada para o display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Line(String),
    Page(DisplayPage),
    /// A fonte de linhas terminou (EOF no stdin)
    Closed,
}

/// Abre a porta, tentando de novo a cada `retry` enquanto o dispositivo não
/// existir. Qualquer outra falha (permissão, porta em uso) é devolvida.
pub fn open_port(
    port_name: &str,
    baud_rate: u32,
    timeout: Duration,
    retry: Duration,
) -> Result<Box<dyn SerialPort>, serialport::Error> {
    loop {
        match serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
        {
            Ok(port) => {
                info!("Receiver escutando em {port_name} ({baud_rate} baud 8N1)");
                return Ok(port);
            }
            Err(e) if is_device_absent(&e) => {
                warn!(
                    "Porta {port_name} ausente: {e}. Tentando novamente em {}s...",
                    retry.as_secs()
                );
                std::thread::sleep(retry);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Só a ausência do dispositivo justifica nova tentativa.
fn is_device_absent(e: &serialport::Error) -> bool {
    matches!(
        e.kind(),
        serialport::ErrorKind::NoDevice | serialport::ErrorKind::Io(io::ErrorKind::NotFound)
    )
}

/// Inicia a thread que lê linhas da serial. Retorna o receiver do channel.
pub fn spawn_serial_reader(port: Box<dyn SerialPort>) -> io::Result<(Sender<SourceEvent>, Receiver<SourceEvent>)> {
    let (tx, rx) = bounded::<SourceEvent>(64); // Buffer de 64 mensagens
    let thread_tx = tx.clone();

    std::thread::Builder::new()
        .name("serial-reader".into())
        .spawn(move || {
            read_lines(BufReader::new(port), SERIAL_LINE_TERMINATOR as u8, &thread_tx);
        })?;

    Ok((tx, rx))
}

/// Inicia a thread que lê linhas do stdin (ex: `telemetry_sender | telemetry_receiver`).
pub fn spawn_stdin_reader() -> io::Result<Receiver<SourceEvent>> {
    let (tx, rx) = bounded::<SourceEvent>(64);

    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            read_lines(io::stdin().lock(), b'\n', &tx);
        })?;

    Ok(rx)
}

/// Inicia a thread que lê comandos de página do stdin.
pub fn spawn_page_commands(tx: Sender<SourceEvent>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("page-commands".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match line.parse::<DisplayPage>() {
                    Ok(page) => {
                        if tx.send(SourceEvent::Page(page)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{e} (use gpu/cpu/other ou a/b/c)"),
                }
            }
        })?;
    Ok(())
}

/// Lê linhas terminadas em `terminator` e as envia pelo channel.
///
/// Timeouts da porta não perdem bytes: a linha parcial continua no buffer.
pub fn read_lines<R: BufRead>(mut reader: R, terminator: u8, tx: &Sender<SourceEvent>) {
    let mut buf = Vec::new();
    loop {
        match reader.read_until(terminator, &mut buf) {
            Ok(0) => {
                if !buf.is_empty() {
                    send_line(&buf, tx);
                }
                let _ = tx.send(SourceEvent::Closed);
                return;
            }
            Ok(_) => {
                if buf.last() == Some(&terminator) {
                    if !send_line(&buf, tx) {
                        return;
                    }
                    buf.clear();
                }
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                // Timeout normal, continua
            }
            Err(e) => {
                warn!("Erro ao ler entrada: {e}");
                let _ = tx.send(SourceEvent::Closed);
                return;
            }
        }
    }
}

/// Envia a linha sem terminadores. Retorna `false` se o display saiu.
fn send_line(raw: &[u8], tx: &Sender<SourceEvent>) -> bool {
    let line = String::from_utf8_lossy(raw).trim().to_string();
    if line.is_empty() {
        return true;
    }
    debug!("← {} bytes", raw.len());
    tx.send(SourceEvent::Line(line)).is_ok()
}
