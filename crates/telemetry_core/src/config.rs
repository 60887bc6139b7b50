//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável. A porta serial não fica
//! aqui: ela vem sempre da linha de comando.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::protocol::BAUD_RATE;

/// Backends de sensores aceitos em `sender.backend`.
pub const BACKENDS: [&str; 3] = ["auto", "lhm", "components"];

/// Páginas aceitas em `receiver.start_page`.
pub const PAGES: [&str; 3] = ["gpu", "cpu", "other"];

/// Erros ao salvar a configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao serializar configuração: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro ao escrever {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuração do Sender (PC monitorado).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Intervalo fixo entre ciclos (ms)
    pub interval_ms: u64,
    /// Espera entre tentativas de abrir a porta ausente (segundos)
    pub connect_backoff_secs: u64,
    /// Baud rate da serial
    pub baud_rate: u32,
    /// Timeout de escrita/leitura na porta (ms)
    pub write_timeout_ms: u64,
    /// Encerra se o hardware exigido não existir no primeiro ciclo
    pub fail_fast_on_missing_hardware: bool,
    /// Fonte de sensores: "auto", "lhm" ou "components" (só diagnóstico)
    pub backend: String,
    /// Prazo após o primeiro Ctrl+C antes de forçar a saída (segundos)
    pub shutdown_grace_secs: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            connect_backoff_secs: 60,
            baud_rate: BAUD_RATE,
            write_timeout_ms: 1000,
            fail_fast_on_missing_hardware: true,
            backend: "auto".into(),
            shutdown_grace_secs: 5,
        }
    }
}

/// Configuração do Receiver (display).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Baud rate da serial
    pub baud_rate: u32,
    /// Timeout de leitura da porta (ms)
    pub read_timeout_ms: u64,
    /// Espera entre tentativas de abrir a porta ausente (segundos)
    pub reconnect_secs: u64,
    /// Página inicial: "gpu", "cpu" ou "other"
    pub start_page: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            read_timeout_ms: 200,
            reconnect_secs: 2,
            start_page: "gpu".into(),
        }
    }
}

/// Configuração raiz do aplicativo (unifica sender e receiver).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sender: SenderConfig,
    pub receiver: ReceiverConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    ///
    /// Arquivo ausente ou inválido resulta na configuração padrão.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Carrega a configuração e grava o arquivo padrão quando ele não existe.
    ///
    /// Falha ao gravar é só logada: o processo segue com os padrões.
    pub fn load_or_init(path: &Path) -> Self {
        let config = Self::load(path);
        if !path.exists() {
            if let Err(e) = config.save(path) {
                warn!("Não foi possível salvar config padrão: {e}");
            }
        }
        config
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.sender.interval_ms < 100 || self.sender.interval_ms > 60_000 {
            errors.push(format!(
                "Intervalo do sender inválido: {} ms (100–60000)",
                self.sender.interval_ms
            ));
        }
        if self.sender.connect_backoff_secs == 0 {
            errors.push("Espera de reconexão não pode ser 0".into());
        }
        if self.sender.baud_rate == 0 {
            errors.push("Baud rate do sender não pode ser 0".into());
        }
        if !BACKENDS.contains(&self.sender.backend.as_str()) {
            errors.push(format!(
                "Backend desconhecido: '{}' (aceitos: {})",
                self.sender.backend,
                BACKENDS.join(", ")
            ));
        }
        if self.sender.shutdown_grace_secs == 0 {
            errors.push("Prazo de encerramento não pode ser 0".into());
        }
        if self.receiver.baud_rate == 0 {
            errors.push("Baud rate do receiver não pode ser 0".into());
        }
        if self.receiver.reconnect_secs == 0 {
            errors.push("Espera de reconexão do receiver não pode ser 0".into());
        }
        if !PAGES.contains(&self.receiver.start_page.as_str()) {
            errors.push(format!(
                "Página inicial desconhecida: '{}' (aceitas: {})",
                self.receiver.start_page,
                PAGES.join(", ")
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn defaults_match_serial_link() {
        let config = AppConfig::default();
        assert_eq!(config.sender.interval_ms, 2000);
        assert_eq!(config.sender.connect_backoff_secs, 60);
        assert_eq!(config.sender.baud_rate, 115_200);
        assert_eq!(config.receiver.baud_rate, 115_200);
        assert_eq!(config.sender.shutdown_grace_secs, 5);
        assert_eq!(config.receiver.reconnect_secs, 2);
    }

    #[test]
    fn zero_waits_are_reported() {
        let mut config = AppConfig::default();
        config.sender.shutdown_grace_secs = 0;
        config.receiver.reconnect_secs = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "Erros: {:?}", errors);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[sender]
interval_ms = 500
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.sender.interval_ms, 500);
        // Outros campos devem ter valor padrão
        assert_eq!(config.sender.connect_backoff_secs, 60);
        assert_eq!(config.receiver.start_page, "gpu");
    }

    #[test]
    fn unknown_backend_is_reported() {
        let mut config = AppConfig::default();
        config.sender.backend = "nvml".into();
        config.receiver.start_page = "fans".into();
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "Erros: {:?}", errors);
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.sender.backend = "components".into();
        config.receiver.start_page = "cpu".into();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.sender.backend, "components");
        assert_eq!(loaded.receiver.start_page, "cpu");
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sender = 12").unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.sender.interval_ms, 2000);
    }

    #[test]
    fn load_or_init_writes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_or_init(&path);

        assert!(path.exists());
        assert_eq!(config.sender.interval_ms, 2000);
        let reloaded = AppConfig::load(&path);
        assert_eq!(reloaded.receiver.start_page, "gpu");
    }

    #[test]
    fn load_or_init_survives_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("config.toml");

        let config = AppConfig::load_or_init(&path);

        assert!(!path.exists());
        assert_eq!(config.sender.backend, "auto");
    }
}
