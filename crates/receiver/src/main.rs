//! # Telemetria Receiver
//!
//! Display de terminal para o stream de telemetria do Sender.
//!
//! Lê uma linha JSON por snapshot (da serial ou do stdin) e mostra uma das
//! três páginas do display: GPU, CPU ou "other".
//!
//! ## Uso
//! ```bash
//! telemetry_receiver /dev/ttyACM0            # Serial; digite gpu/cpu/other (ou a/b/c)
//! telemetry_sender | telemetry_receiver      # Linhas pelo stdin
//! ```

mod display;
mod source;

use clap::Parser;
use display::{DisplayPage, DisplayState, LineOutcome, Screen};
use source::SourceEvent;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::time::Duration;
use telemetry_core::config::AppConfig;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "telemetry_receiver")]
#[command(about = "Mostra a telemetria recebida pela serial (ou stdin)")]
struct Args {
    /// Porta serial a escutar. Sem porta, lê linhas do stdin.
    port: Option<String>,

    /// Página inicial: gpu, cpu ou other (padrão: config.toml)
    #[arg(long)]
    page: Option<String>,
}

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    // ── Config ──
    let config_path = AppConfig::default_path();
    let config = AppConfig::load_or_init(&config_path);
    for problem in config.validate() {
        warn!("Config: {problem}");
    }
    let receiver_cfg = &config.receiver;

    let page_name = args.page.as_deref().unwrap_or(&receiver_cfg.start_page);
    let page = match page_name.parse::<DisplayPage>() {
        Ok(page) => page,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // ── Fontes ──
    let (events, mut reply_port) = match &args.port {
        Some(port_name) => {
            let port = match source::open_port(
                port_name,
                receiver_cfg.baud_rate,
                Duration::from_millis(receiver_cfg.read_timeout_ms),
                Duration::from_secs(receiver_cfg.reconnect_secs),
            ) {
                Ok(port) => port,
                Err(e) => {
                    error!("Falha ao abrir {port_name}: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let writer = match port.try_clone() {
                Ok(writer) => Some(writer),
                Err(e) => {
                    warn!("Sem canal de resposta para o sender: {e}");
                    None
                }
            };
            let (tx, rx) = match source::spawn_serial_reader(port) {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Falha ao criar thread de leitura: {e}");
                    return ExitCode::FAILURE;
                }
            };
            if let Err(e) = source::spawn_page_commands(tx) {
                warn!("Troca de página indisponível: {e}");
            }
            (rx, writer)
        }
        None => match source::spawn_stdin_reader() {
            Ok(rx) => (rx, None),
            Err(e) => {
                error!("Falha ao criar thread de leitura: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let mut state = DisplayState::new(page);
    let mut out = io::stdout();
    let clear = out.is_terminal();
    if let Err(e) = draw(&mut out, &Screen::waiting(), clear) {
        error!("Falha ao escrever na tela: {e}");
        return ExitCode::FAILURE;
    }

    // ── Loop do display ──
    for event in events.iter() {
        let redraw = match event {
            SourceEvent::Line(line) => match state.apply_line(&line) {
                LineOutcome::Updated => true,
                LineOutcome::TooShort(report) => {
                    info!("{report}");
                    if let Some(port) = reply_port.as_mut() {
                        // O sender registra isto como "Dispositivo disse"
                        if let Err(e) = port.write_all(format!("{report}\r\n").as_bytes()) {
                            debug!("Falha ao responder ao sender: {e}");
                        }
                    }
                    false
                }
                LineOutcome::Invalid(e) => {
                    warn!("Linha ignorada: {e}");
                    false
                }
            },
            SourceEvent::Page(page) => {
                state.set_page(page);
                debug!("Página: {:?}", state.page());
                true
            }
            SourceEvent::Closed => {
                info!("Entrada encerrada após {} registros", state.records());
                break;
            }
        };

        if redraw {
            if let Err(e) = draw(&mut out, &state.render(), clear) {
                error!("Falha ao escrever na tela: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn draw(out: &mut impl Write, screen: &Screen, clear: bool) -> io::Result<()> {
    if clear {
        write!(out, "\x1b[2J\x1b[H")?;
    }
    write!(out, "{screen}")?;
    if !clear {
        writeln!(out)?;
    }
    out.flush()
}
