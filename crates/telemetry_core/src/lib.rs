//! # Telemetry Core
//!
//! Crate compartilhada que define o snapshot de telemetria, o protocolo
//! de linha JSON usado na serial e a configuração TOML do sistema.
//!
//! ## Módulos
//! - [`types`] – Snapshot, tipos de hardware e leituras de sensor
//! - [`protocol`] – Encode/decode de linha JSON
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod protocol;
pub mod config;

// Re-exports convenientes
pub use types::{HardwareType, SensorKind, SensorReading, TelemetrySnapshot};
pub use protocol::{decode_line, encode_line, ProtocolError};
pub use config::{AppConfig, ReceiverConfig, SenderConfig};
