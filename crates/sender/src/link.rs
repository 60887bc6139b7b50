//! Gerenciador do link serial.
//!
//! Mantém uma única conexão e o seu estado ([`LinkState`]):
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
//!                              │    ▲                │
//!                   dispositivo│    │espera          │falha de escrita
//!                    ausente   └────┘                ▼
//!                                               Disconnected
//! ```
//!
//! Uma falha de escrita derruba o link para `Disconnected` e o loop passa a
//! usar o console até o processo reiniciar.

use crate::pause::{Pause, PauseOutcome};
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};

// ──────────────────────────────────────────────
// Transporte
// ──────────────────────────────────────────────

/// Parâmetros de abertura da porta (sempre 8N1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    /// Timeout de escrita/leitura da porta
    pub timeout: Duration,
}

/// Falhas ao abrir a porta.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Dispositivo '{0}' não existe")]
    DeviceAbsent(String),

    #[error("{0}")]
    Other(String),
}

/// Uma porta serial aberta.
pub trait SerialLine {
    /// Escreve `line` seguida do terminador `\r`.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Bytes recebidos ainda não lidos (não bloqueia).
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    fn read_line(&mut self) -> io::Result<String>;

    fn close(&mut self) -> io::Result<()>;
}

/// Abre portas seriais pelo nome.
pub trait SerialConnector {
    type Line: SerialLine;

    fn open(&mut self, port_name: &str, settings: &SerialSettings) -> Result<Self::Line, OpenError>;
}

// ──────────────────────────────────────────────
// Estado e erros
// ──────────────────────────────────────────────

/// Estado do link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Política de tentativas de abertura.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Espera fixa depois de cada tentativa com dispositivo ausente
    pub backoff: Duration,
    /// `None` = tenta para sempre
    pub max_attempts: Option<u32>,
}

impl ConnectPolicy {
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff,
            max_attempts: None,
        }
    }
}

/// Erros do link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Falha ao abrir a porta '{port}': {source}")]
    Open {
        port: String,
        #[source]
        source: OpenError,
    },

    #[error("Porta '{port}' não apareceu após {attempts} tentativas")]
    RetriesExhausted { port: String, attempts: u32 },

    #[error("Conexão interrompida pelo sinal de encerramento")]
    Interrupted,

    #[error("Link serial não está conectado")]
    NotConnected,

    #[error("Falha de escrita na serial: {0}")]
    Write(#[source] io::Error),
}

// ──────────────────────────────────────────────
// Link Manager
// ──────────────────────────────────────────────

/// Dono exclusivo da conexão serial.
pub struct LinkManager<C: SerialConnector> {
    connector: C,
    settings: SerialSettings,
    state: LinkState,
    port_name: Option<String>,
    line: Option<C::Line>,
}

impl<C: SerialConnector> LinkManager<C> {
    pub fn new(connector: C, settings: SerialSettings) -> Self {
        Self {
            connector,
            settings,
            state: LinkState::Disconnected,
            port_name: None,
            line: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    #[cfg(test)]
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Abre a porta, esperando `policy.backoff` entre tentativas enquanto o
    /// dispositivo não existir. Qualquer outra falha é definitiva.
    pub fn connect(
        &mut self,
        port_name: &str,
        policy: &ConnectPolicy,
        pause: &mut dyn Pause,
    ) -> Result<(), LinkError> {
        self.port_name = Some(port_name.to_string());
        self.state = LinkState::Connecting;
        info!("Tentando abrir a porta '{port_name}'...");

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.connector.open(port_name, &self.settings) {
                Ok(line) => {
                    self.line = Some(line);
                    self.state = LinkState::Connected;
                    info!("Porta '{port_name}' aberta com sucesso");
                    return Ok(());
                }
                Err(OpenError::DeviceAbsent(_)) => {
                    if policy.max_attempts.is_some_and(|max| attempts >= max) {
                        self.state = LinkState::Disconnected;
                        return Err(LinkError::RetriesExhausted {
                            port: port_name.to_string(),
                            attempts,
                        });
                    }
                    warn!(
                        "Não foi possível abrir '{port_name}' (tentativa {attempts}), o dispositivo provavelmente ainda não está conectado. Nova tentativa em {}s",
                        policy.backoff.as_secs()
                    );
                    if pause.pause(policy.backoff) == PauseOutcome::Interrupted {
                        self.state = LinkState::Disconnected;
                        return Err(LinkError::Interrupted);
                    }
                }
                Err(source) => {
                    self.state = LinkState::Disconnected;
                    return Err(LinkError::Open {
                        port: port_name.to_string(),
                        source,
                    });
                }
            }
        }
    }

    /// Escreve uma linha no link.
    ///
    /// Retorna a resposta do dispositivo, se havia bytes pendentes logo após
    /// a escrita. Uma falha de escrita derruba o link para `Disconnected`.
    pub fn try_write(&mut self, line: &str) -> Result<Option<String>, LinkError> {
        let Some(port) = self.line.as_mut() else {
            return Err(LinkError::NotConnected);
        };

        if let Err(e) = port.write_line(line) {
            warn!("Falha de escrita na serial, usando o console a partir de agora: {e}");
            self.line = None;
            self.state = LinkState::Disconnected;
            return Err(LinkError::Write(e));
        }

        // Leitura de volta é só diagnóstico
        match port.bytes_to_read() {
            Ok(0) => Ok(None),
            Ok(_) => match port.read_line() {
                Ok(reply) => Ok(Some(reply)),
                Err(e) => {
                    debug!("Falha ao ler resposta do dispositivo: {e}");
                    Ok(None)
                }
            },
            Err(e) => {
                debug!("Falha ao consultar bytes pendentes: {e}");
                Ok(None)
            }
        }
    }

    /// Libera a porta. Falhas são apenas logadas.
    pub fn close(&mut self) {
        if let Some(mut port) = self.line.take() {
            info!(
                "Fechando porta serial '{}'...",
                self.port_name.as_deref().unwrap_or("?")
            );
            if let Err(e) = port.close() {
                warn!("Erro ao fechar porta serial: {e}");
            }
        }
        self.state = LinkState::Disconnected;
    }
}

// ──────────────────────────────────────────────
// Fakes para testes
// ──────────────────────────────────────────────
