//! Loop principal: atualizar sensores → montar snapshot → codificar →
//! entregar (serial ou console) → esperar.
//!
//! O intervalo é um atraso fixo entre ciclos; o tempo gasto no ciclo não é
//! descontado.

use crate::catalog::{refresh_all, SensorError};
use crate::hardware::SensorBackend;
use crate::link::{ConnectPolicy, LinkError, LinkManager, SerialConnector};
use crate::pause::{Pause, PauseOutcome};
use crate::snapshot::build_snapshot;
use std::io::{self, Write};
use std::time::Duration;
use telemetry_core::protocol::encode_line;
use tracing::{debug, error, info, warn};

/// Erros que encerram o loop.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Hardware exigido ausente no primeiro ciclo: {0}")]
    MissingHardware(#[source] SensorError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Falha ao escrever no console: {0}")]
    Console(#[from] io::Error),
}

/// O que aconteceu em um ciclo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Linha escrita na serial (com a resposta do dispositivo, se houve)
    Serial { reply: Option<String> },
    /// Linha escrita no console
    Console,
    /// A escrita na serial falhou; a linha foi para o console
    LinkLost,
    /// Snapshot incompleto, nada foi entregue
    Skipped,
}

/// Parâmetros do loop.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryOptions {
    pub interval: Duration,
    /// Encerra se o hardware exigido faltar já no primeiro ciclo
    pub fail_fast_on_missing_hardware: bool,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            fail_fast_on_missing_hardware: true,
        }
    }
}

/// Dono do backend, do link e da saída de console.
pub struct DeliveryLoop<B: SensorBackend, C: SerialConnector, W: Write> {
    backend: B,
    link: LinkManager<C>,
    console: W,
    options: DeliveryOptions,
    ticks: u64,
}

impl<B: SensorBackend, C: SerialConnector, W: Write> DeliveryLoop<B, C, W> {
    pub fn new(backend: B, link: LinkManager<C>, console: W, options: DeliveryOptions) -> Self {
        Self {
            backend,
            link,
            console,
            options,
            ticks: 0,
        }
    }

    #[cfg(test)]
    pub fn link(&self) -> &LinkManager<C> {
        &self.link
    }

    #[cfg(test)]
    pub fn console(&self) -> &W {
        &self.console
    }

    #[cfg(test)]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Abre o link antes do primeiro ciclo (bloqueia enquanto o
    /// dispositivo não aparecer).
    pub fn connect_link(
        &mut self,
        port_name: &str,
        policy: &ConnectPolicy,
        pause: &mut dyn Pause,
    ) -> Result<(), LinkError> {
        self.link.connect(port_name, policy, pause)
    }

    /// Executa um ciclo.
    pub fn tick(&mut self) -> Result<TickOutcome, DeliveryError> {
        self.ticks += 1;

        // Toda a árvore precisa ser atualizada antes de qualquer leitura
        refresh_all(self.backend.hardware_mut());

        let snapshot = match build_snapshot(self.backend.hardware()) {
            Ok(snapshot) => snapshot,
            Err(e @ SensorError::HardwareNotFound(_))
                if self.ticks == 1 && self.options.fail_fast_on_missing_hardware =>
            {
                return Err(DeliveryError::MissingHardware(e));
            }
            Err(e) => {
                warn!("Ciclo {} ignorado: {e}", self.ticks);
                return Ok(TickOutcome::Skipped);
            }
        };

        let line = match encode_line(&snapshot) {
            Ok(line) => line,
            Err(e) => {
                error!("Ciclo {} ignorado: {e}", self.ticks);
                return Ok(TickOutcome::Skipped);
            }
        };

        if self.link.is_connected() {
            return match self.link.try_write(&line) {
                Ok(reply) => {
                    debug!(
                        "→ serial | GPU {:.1}°C {:.1}W | CPU {:.1}°C {:.1}W",
                        snapshot.gpu_core_temp_c,
                        snapshot.gpu_power_watts,
                        snapshot.cpu_core_temp_c,
                        snapshot.cpu_package_power_watts
                    );
                    if let Some(reply) = &reply {
                        info!("Dispositivo disse: {reply}");
                    }
                    Ok(TickOutcome::Serial { reply })
                }
                Err(e) => {
                    warn!("{e}");
                    self.write_console(&line)?;
                    Ok(TickOutcome::LinkLost)
                }
            };
        }

        self.write_console(&line)?;
        Ok(TickOutcome::Console)
    }

    /// Roda ciclos até a espera ser interrompida.
    pub fn run(&mut self, pause: &mut dyn Pause) -> Result<(), DeliveryError> {
        info!("Enviando dados...");
        loop {
            self.tick()?;
            if pause.pause(self.options.interval) == PauseOutcome::Interrupted {
                info!("Sinal de encerramento recebido após {} ciclos", self.ticks);
                return Ok(());
            }
        }
    }

    /// Libera a porta serial e depois o backend.
    pub fn shutdown(mut self) {
        self.link.close();
        info!("Fechando backend de sensores '{}'...", self.backend.name());
        self.backend.close();
        info!("Pronto.");
    }

    fn write_console(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.console, "{line}")?;
        self.console.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::fake::{amd_cpu, nvidia_gpu, FakeBackend};
    use crate::link::fake::{settings, FakeConnector};
    use crate::link::LinkState;
    use crate::pause::fake::RecordingPause;
    use telemetry_core::protocol::decode_line;
    use telemetry_core::types::HardwareType;

    type TestLoop = DeliveryLoop<FakeBackend, FakeConnector, Vec<u8>>;

    fn delivery(backend: FakeBackend, connector: FakeConnector) -> TestLoop {
        DeliveryLoop::new(
            backend,
            LinkManager::new(connector, settings()),
            Vec::new(),
            DeliveryOptions::default(),
        )
    }

    fn console_lines(d: &TestLoop) -> Vec<String> {
        String::from_utf8(d.console().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn without_port_every_tick_goes_to_console() {
        let connector = FakeConnector::default();
        let opens = connector.opens.clone();
        let log = connector.log.clone();
        let mut d = delivery(FakeBackend::complete(), connector);
        let mut pause = RecordingPause::interrupt_after(4);

        d.run(&mut pause).unwrap();

        let lines = console_lines(&d);
        assert_eq!(lines.len(), 5);
        assert_eq!(d.ticks(), 5);
        for line in &lines {
            let s = decode_line(line).unwrap();
            assert_eq!(s.gpu_core_temp_c, 26.0);
        }
        assert_eq!(*opens.borrow(), 0);
        assert!(log.borrow().written.is_empty());
    }

    #[test]
    fn pauses_fixed_interval_between_ticks() {
        let mut d = delivery(FakeBackend::complete(), FakeConnector::default());
        let mut pause = RecordingPause::interrupt_after(3);

        d.run(&mut pause).unwrap();

        assert_eq!(pause.pauses, vec![Duration::from_millis(2000); 3]);
    }

    #[test]
    fn refresh_happens_every_tick() {
        let gpu = nvidia_gpu();
        let updates = gpu.updates.clone();
        let backend = FakeBackend::new(vec![gpu.boxed(), amd_cpu().boxed()]);
        let mut d = delivery(backend, FakeConnector::default());

        d.tick().unwrap();
        d.tick().unwrap();

        assert_eq!(updates.get(), 2);
    }

    #[test]
    fn absent_device_then_connected_writes_ticks_to_link() {
        let connector = FakeConnector::absent_times(2);
        let log = connector.log.clone();
        let mut d = delivery(FakeBackend::complete(), connector);
        let mut backoff = RecordingPause::default();

        d.connect_link("COM7", &ConnectPolicy::unbounded(Duration::from_secs(60)), &mut backoff)
            .unwrap();
        assert_eq!(backoff.pauses, vec![Duration::from_secs(60); 2]);

        let mut pause = RecordingPause::interrupt_after(2);
        d.run(&mut pause).unwrap();

        let log = log.borrow();
        let written = &log.written;
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|l| l.ends_with('\r') && !l.ends_with('\n')));
        assert!(console_lines(&d).is_empty());
    }

    #[test]
    fn write_failure_falls_back_to_console() {
        let connector = FakeConnector::default();
        let log = connector.log.clone();
        let opens = connector.opens.clone();
        let mut d = delivery(FakeBackend::complete(), connector);
        d.connect_link("COM7", &ConnectPolicy::unbounded(Duration::from_secs(60)), &mut RecordingPause::default())
            .unwrap();

        assert!(matches!(d.tick().unwrap(), TickOutcome::Serial { reply: None }));
        log.borrow_mut().fail_writes = true;
        assert_eq!(d.tick().unwrap(), TickOutcome::LinkLost);
        assert_eq!(d.link().state(), LinkState::Disconnected);
        assert_eq!(d.tick().unwrap(), TickOutcome::Console);

        assert_eq!(console_lines(&d).len(), 2);
        assert_eq!(*opens.borrow(), 1);
    }

    #[test]
    fn device_reply_is_reported() {
        let connector = FakeConnector::default();
        let log = connector.log.clone();
        let mut d = delivery(FakeBackend::complete(), connector);
        d.connect_link("COM7", &ConnectPolicy::unbounded(Duration::from_secs(60)), &mut RecordingPause::default())
            .unwrap();
        log.borrow_mut().replies.push_back("hello".into());

        assert_eq!(
            d.tick().unwrap(),
            TickOutcome::Serial {
                reply: Some("hello".into())
            }
        );
    }

    #[test]
    fn missing_hardware_on_first_tick_is_fatal() {
        let backend = FakeBackend::new(vec![amd_cpu().boxed()]);
        let mut d = delivery(backend, FakeConnector::default());

        let err = d.run(&mut RecordingPause::default()).unwrap_err();

        assert!(matches!(
            err,
            DeliveryError::MissingHardware(SensorError::HardwareNotFound(HardwareType::GpuNvidia))
        ));
        assert!(console_lines(&d).is_empty());
    }

    #[test]
    fn missing_hardware_is_skipped_when_not_fail_fast() {
        let backend = FakeBackend::new(vec![amd_cpu().boxed()]);
        let mut d = DeliveryLoop::new(
            backend,
            LinkManager::new(FakeConnector::default(), settings()),
            Vec::new(),
            DeliveryOptions {
                fail_fast_on_missing_hardware: false,
                ..Default::default()
            },
        );

        assert_eq!(d.tick().unwrap(), TickOutcome::Skipped);
        assert!(console_lines(&d).is_empty());
    }

    #[test]
    fn missing_sensor_skips_tick_and_loop_continues() {
        let mut partial = nvidia_gpu();
        partial.sensors.retain(|s| s.name != "GPU Hot Spot");
        let backend = FakeBackend::new(vec![partial.boxed(), amd_cpu().boxed()]);
        let mut d = delivery(backend, FakeConnector::default());

        assert_eq!(d.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(d.tick().unwrap(), TickOutcome::Skipped);
        assert!(console_lines(&d).is_empty());
    }

    #[test]
    fn shutdown_closes_port_then_backend() {
        let connector = FakeConnector::default();
        let log = connector.log.clone();
        let backend = FakeBackend::complete();
        let closed = backend.closed.clone();
        let mut d = delivery(backend, connector);
        d.connect_link("COM7", &ConnectPolicy::unbounded(Duration::from_secs(60)), &mut RecordingPause::default())
            .unwrap();

        d.shutdown();

        assert!(log.borrow().closed);
        assert!(closed.get());
    }
}
