//! Esperas interrompíveis.
//!
//! Toda espera do sender (intervalo entre ciclos e espera entre tentativas
//! de abrir a porta) passa por [`Pause`]. Em produção a espera é um
//! `recv_timeout` no channel alimentado pelo handler de Ctrl+C, então o
//! sinal acorda o loop na hora.
//!
//! Um ciclo em andamento não é interrompido. Se ele travar, um segundo
//! Ctrl+C (ou o fim do prazo `shutdown_grace_secs`) encerra o processo.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Código de saída quando o encerramento é forçado (128 + SIGINT).
pub const FORCED_EXIT_CODE: i32 = 130;

/// Resultado de uma espera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Elapsed,
    Interrupted,
}

/// Fonte de esperas do loop.
pub trait Pause {
    fn pause(&mut self, duration: Duration) -> PauseOutcome;
}

/// O que o handler deve fazer com um sinal recebido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Primeiro sinal: o loop encerra na próxima espera
    Graceful,
    /// Sinal repetido: o ciclo atual está travado, sair na hora
    ForceExit,
}

/// Lado do handler de Ctrl+C.
pub struct ShutdownTrigger {
    tx: Sender<()>,
    fired: AtomicBool,
}

impl ShutdownTrigger {
    /// Registra um sinal. Só o primeiro pede o encerramento normal.
    pub fn signal(&self) -> SignalAction {
        if self.fired.swap(true, Ordering::SeqCst) {
            return SignalAction::ForceExit;
        }
        let _ = self.tx.try_send(());
        SignalAction::Graceful
    }
}

/// Espera ligada ao sinal de encerramento do processo.
pub struct ShutdownSignal {
    rx: Receiver<()>,
    interrupted: bool,
}

impl ShutdownSignal {
    /// Cria o par (gatilho, espera). O gatilho vai para o handler de sinal.
    pub fn new() -> (ShutdownTrigger, Self) {
        let (tx, rx) = bounded(1);
        (
            ShutdownTrigger {
                tx,
                fired: AtomicBool::new(false),
            },
            Self {
                rx,
                interrupted: false,
            },
        )
    }
}

impl Pause for ShutdownSignal {
    fn pause(&mut self, duration: Duration) -> PauseOutcome {
        if self.interrupted {
            return PauseOutcome::Interrupted;
        }
        match self.rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => PauseOutcome::Elapsed,
            // Sinal recebido ou gatilho descartado: encerrar
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.interrupted = true;
                PauseOutcome::Interrupted
            }
        }
    }
}

// ──────────────────────────────────────────────
// Fakes para testes
// ──────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// Registra cada espera e interrompe depois de `limit` esperas.
    #[derive(Default)]
    pub struct RecordingPause {
        pub pauses: Vec<Duration>,
        pub limit: Option<usize>,
    }

    impl RecordingPause {
        pub fn interrupt_after(limit: usize) -> Self {
            Self {
                pauses: Vec::new(),
                limit: Some(limit),
            }
        }
    }

    impl Pause for RecordingPause {
        fn pause(&mut self, duration: Duration) -> PauseOutcome {
            if self.limit.is_some_and(|limit| self.pauses.len() >= limit) {
                return PauseOutcome::Interrupted;
            }
            self.pauses.push(duration);
            PauseOutcome::Elapsed
        }
    }
}
