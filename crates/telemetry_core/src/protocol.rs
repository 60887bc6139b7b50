//! Protocolo de linha JSON da serial.
//!
//! Cada ciclo gera um objeto JSON autocontido em uma única linha:
//!
//! ```text
//! {"GpuCoreTempC":26.0,"GpuHotSpotTempC":34.34375,"GpuPowerWatts":27.81,"CpuCoreTempC":50.5,"CpuCcdTempC":35.75,"CpuPackagePowerWatts":36.78}
//! ```
//!
//! - Na serial a linha termina com [`SERIAL_LINE_TERMINATOR`] (`\r`, sem `\n`)
//! - No console (fallback) a linha termina com `\n`
//! - Linhas com menos de [`MIN_LINE_LEN`] caracteres são descartadas pelo receptor

use crate::types::TelemetrySnapshot;

/// Terminador de linha usado na escrita pela serial.
pub const SERIAL_LINE_TERMINATOR: char = '\r';

/// Baud rate do link serial (8N1).
pub const BAUD_RATE: u32 = 115_200;

/// Linhas mais curtas que isso não podem ser um snapshot (ruído, eco, etc).
pub const MIN_LINE_LEN: usize = 10;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Linha muito curta ({0} caracteres, mínimo {MIN_LINE_LEN})")]
    TooShort(usize),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Codifica um [`TelemetrySnapshot`] em uma linha JSON (sem terminador).
pub fn encode_line(snapshot: &TelemetrySnapshot) -> Result<String, ProtocolError> {
    serde_json::to_string(snapshot).map_err(|e| ProtocolError::Serialize(e.to_string()))
}

/// Decodifica uma linha recebida em [`TelemetrySnapshot`].
///
/// Espaços e terminadores (`\r`, `\n`) nas pontas são ignorados.
pub fn decode_line(line: &str) -> Result<TelemetrySnapshot, ProtocolError> {
    let line = line.trim();
    if line.len() < MIN_LINE_LEN {
        return Err(ProtocolError::TooShort(line.len()));
    }
    serde_json::from_str(line).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
