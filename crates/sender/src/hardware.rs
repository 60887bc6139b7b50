//! Abstração do backend de sensores de hardware.
//!
//! O backend expõe uma árvore de unidades ([`HardwareUnit`]); cada unidade
//! tem um tipo, um nome, sub-unidades e uma lista de leituras. As leituras
//! só são válidas depois de um `update()` no mesmo ciclo.

use telemetry_core::types::{HardwareType, SensorReading};

/// Erros ao abrir um backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend '{0}' indisponível neste sistema")]
    Unavailable(&'static str),

    #[error("Backend '{0}' não fornece potência; use-o apenas com --list-sensors")]
    DiagnosticOnly(&'static str),

    #[error("Falha ao conectar no backend: {0}")]
    Connect(String),
}

/// Uma unidade de hardware (CPU, GPU, placa-mãe…).
pub trait HardwareUnit {
    fn hardware_type(&self) -> HardwareType;

    fn name(&self) -> &str;

    /// Leituras obtidas no último `update()`.
    fn sensors(&self) -> &[SensorReading];

    fn sub_hardware_mut(&mut self) -> &mut [Box<dyn HardwareUnit>];

    /// Relê o estado do driver. Falhas não são propagadas: a unidade fica
    /// sem valores e o ciclo reporta o sensor como ausente.
    fn update(&mut self);
}

/// Fonte de unidades de hardware.
pub trait SensorBackend {
    /// Nome curto para logs.
    fn name(&self) -> &'static str;

    fn hardware(&self) -> &[Box<dyn HardwareUnit>];

    fn hardware_mut(&mut self) -> &mut [Box<dyn HardwareUnit>];

    /// Libera o backend. Falhas são apenas logadas.
    fn close(&mut self);
}

impl<T: SensorBackend + ?Sized> SensorBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn hardware(&self) -> &[Box<dyn HardwareUnit>] {
        (**self).hardware()
    }

    fn hardware_mut(&mut self) -> &mut [Box<dyn HardwareUnit>] {
        (**self).hardware_mut()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

// ──────────────────────────────────────────────
// Fakes para testes
// ──────────────────────────────────────────────
