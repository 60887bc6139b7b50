//! # Telemetria Sender
//!
//! Lê temperaturas e potência de GPU/CPU a cada ciclo e envia um JSON por
//! linha para o display pela porta serial. Sem porta, escreve no console.
//!
//! ## Uso
//! ```bash
//! telemetry_sender.exe          # Apenas console
//! telemetry_sender.exe COM7     # Serial (espera o dispositivo aparecer)
//! telemetry_sender --list-sensors  # Mostra a árvore de sensores e sai
//! ```
//!
//! Os logs vão para stderr; stdout carrega apenas as linhas de dados.

mod catalog;
mod components;
mod delivery;
mod hardware;
#[cfg(windows)]
pub(crate) mod lhm;
mod link;
mod pause;
mod serial;
mod snapshot;

use clap::Parser;
use catalog::refresh_all;
use delivery::{DeliveryError, DeliveryLoop, DeliveryOptions};
use hardware::{BackendError, SensorBackend};
use link::{ConnectPolicy, LinkError, LinkManager, SerialConnector, SerialSettings};
use pause::{ShutdownSignal, SignalAction, FORCED_EXIT_CODE};
use serial::SystemSerial;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;
use telemetry_core::config::AppConfig;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "telemetry_sender")]
#[command(about = "Envia telemetria de GPU/CPU por serial (ou console)")]
struct Args {
    /// Porta serial do display (ex: COM7, /dev/ttyACM0). Sem porta = console.
    port: Option<String>,

    /// Lista unidades e sensores do backend e confere os sensores exigidos
    #[arg(long)]
    list_sensors: bool,
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

    // ── Carregar config ──
    let config_path = AppConfig::default_path();
    let config = AppConfig::load_or_init(&config_path);
    for problem in config.validate() {
        warn!("Config: {problem}");
    }

    let sender_cfg = &config.sender;

    // ── Backend de sensores ──
    let backend = match open_backend(&sender_cfg.backend, args.list_sensors) {
        Ok(backend) => backend,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if args.list_sensors {
        return list_sensors(backend);
    }

    // ── Sinal de encerramento ──
    let (trigger, mut signal) = ShutdownSignal::new();
    let grace = Duration::from_secs(sender_cfg.shutdown_grace_secs);
    if let Err(e) = ctrlc::set_handler(move || match trigger.signal() {
        SignalAction::Graceful => spawn_watchdog(grace),
        SignalAction::ForceExit => {
            eprintln!("Encerramento forçado");
            std::process::exit(FORCED_EXIT_CODE);
        }
    }) {
        error!("Falha ao instalar handler de Ctrl+C: {e}");
        return ExitCode::FAILURE;
    }

    let settings = SerialSettings {
        baud_rate: sender_cfg.baud_rate,
        timeout: Duration::from_millis(sender_cfg.write_timeout_ms),
    };
    let options = DeliveryOptions {
        interval: Duration::from_millis(sender_cfg.interval_ms),
        fail_fast_on_missing_hardware: sender_cfg.fail_fast_on_missing_hardware,
    };
    let policy = ConnectPolicy::unbounded(Duration::from_secs(sender_cfg.connect_backoff_secs));

    // ── Banner ──
    eprintln!();
    eprintln!("══════════════════════════════════════════════");
    eprintln!("   ⚡ TELEMETRIA SENDER – SERIAL (Rust)");
    eprintln!("══════════════════════════════════════════════");
    eprintln!("  Porta:     {}", args.port.as_deref().unwrap_or("(console)"));
    eprintln!("  Backend:   {}", backend.name());
    eprintln!("  Intervalo: {} ms", sender_cfg.interval_ms);
    eprintln!("  Serial:    {} baud 8N1", sender_cfg.baud_rate);
    eprintln!("══════════════════════════════════════════════");
    eprintln!();

    let mut delivery = DeliveryLoop::new(
        backend,
        LinkManager::new(SystemSerial, settings),
        io::stdout(),
        options,
    );

    let result = run(&mut delivery, args.port.as_deref(), &policy, &mut signal);

    info!("Encerrando...");
    delivery.shutdown();

    match result {
        Ok(()) | Err(DeliveryError::Link(LinkError::Interrupted)) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            if let DeliveryError::Link(LinkError::Open { .. }) = e {
                let ports = serial::available_port_names();
                if ports.is_empty() {
                    error!("Nenhuma porta serial encontrada no sistema");
                } else {
                    error!("Portas disponíveis: {}", ports.join(", "));
                }
            }
            ExitCode::FAILURE
        }
    }
}

/// Conecta (se houver porta) e roda o loop até o sinal de encerramento.
fn run<B: SensorBackend, C: SerialConnector, W: Write>(
    delivery: &mut DeliveryLoop<B, C, W>,
    port: Option<&str>,
    policy: &ConnectPolicy,
    signal: &mut ShutdownSignal,
) -> Result<(), DeliveryError> {
    match port {
        Some(port) => delivery.connect_link(port, policy, signal)?,
        None => info!("Nenhuma porta informada, escrevendo no console"),
    }
    delivery.run(signal)
}

// ──────────────────────────────────────────────
// Encerramento forçado
// ──────────────────────────────────────────────

/// Sai do processo se o encerramento normal não terminar dentro do prazo.
fn spawn_watchdog(grace: Duration) {
    let spawned = std::thread::Builder::new()
        .name("shutdown-watchdog".into())
        .spawn(move || {
            std::thread::sleep(grace);
            eprintln!("Encerramento não terminou em {}s, saindo", grace.as_secs());
            std::process::exit(FORCED_EXIT_CODE);
        });
    if let Err(e) = spawned {
        warn!("Falha ao criar watchdog de encerramento: {e}");
    }
}

// ──────────────────────────────────────────────
// Seleção do backend
// ──────────────────────────────────────────────

/// Abre o backend configurado.
///
/// `components` (sysinfo) não expõe potência, então só é aceito no modo
/// `--list-sensors`. Nesse modo `auto` cai para ele quando o LHM não existe.
fn open_backend(kind: &str, listing: bool) -> Result<Box<dyn SensorBackend>, BackendError> {
    match kind {
        "components" if listing => Ok(Box::new(components::ComponentsBackend::new())),
        "components" => Err(BackendError::DiagnosticOnly("components")),
        "lhm" => open_lhm(),
        _ => match open_lhm() {
            Ok(backend) => Ok(backend),
            Err(e) if listing => {
                info!("{e}, listando via sysinfo");
                Ok(Box::new(components::ComponentsBackend::new()))
            }
            Err(e) => Err(e),
        },
    }
}

#[cfg(windows)]
fn open_lhm() -> Result<Box<dyn SensorBackend>, BackendError> {
    Ok(Box::new(lhm::LhmBackend::try_new()?))
}

#[cfg(not(windows))]
fn open_lhm() -> Result<Box<dyn SensorBackend>, BackendError> {
    Err(BackendError::Unavailable("lhm"))
}

// ──────────────────────────────────────────────
// Diagnóstico
// ──────────────────────────────────────────────

fn list_sensors(mut backend: Box<dyn SensorBackend>) -> ExitCode {
    refresh_all(backend.hardware_mut());

    let mut out = io::stdout().lock();
    let result = writeln!(out, "Backend: {}", backend.name())
        .and_then(|()| catalog::write_tree(&mut out, backend.hardware_mut()))
        .and_then(|()| writeln!(out))
        .and_then(|()| snapshot::write_required_status(&mut out, backend.hardware()));
    backend.close();

    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(missing) => {
            warn!("{missing} sensor(es) exigido(s) ausente(s) neste backend");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Falha ao escrever a lista: {e}");
            ExitCode::FAILURE
        }
    }
}
