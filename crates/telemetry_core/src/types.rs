//! Definição de tipos/structs para telemetria.
//!
//! O [`TelemetrySnapshot`] é o registro enviado a cada ciclo pela serial;
//! [`HardwareType`], [`SensorKind`] e [`SensorReading`] descrevem o que o
//! backend de sensores expõe.

use serde::{Deserialize, Serialize};
use std::fmt;

// ──────────────────────────────────────────────
// Hardware
// ──────────────────────────────────────────────

/// Classificação de um componente de hardware.
///
/// Os nomes seguem os valores de `HardwareType` do LibreHardwareMonitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareType {
    Cpu,
    GpuNvidia,
    GpuAmd,
    GpuIntel,
    Motherboard,
    SuperIo,
    Memory,
    Storage,
    Network,
    Cooler,
    EmbeddedController,
    Psu,
    Battery,
    Other,
}

impl HardwareType {
    /// Converte a string reportada pelo LHM (ex: `"GpuNvidia"`).
    /// Tipos desconhecidos viram [`HardwareType::Other`].
    pub fn from_lhm(value: &str) -> Self {
        match value {
            "Cpu" => Self::Cpu,
            "GpuNvidia" => Self::GpuNvidia,
            "GpuAmd" => Self::GpuAmd,
            "GpuIntel" => Self::GpuIntel,
            "Motherboard" => Self::Motherboard,
            "SuperIO" => Self::SuperIo,
            "Memory" => Self::Memory,
            "Storage" => Self::Storage,
            "Network" => Self::Network,
            "Cooler" => Self::Cooler,
            "EmbeddedController" => Self::EmbeddedController,
            "Psu" => Self::Psu,
            "Battery" => Self::Battery,
            _ => Self::Other,
        }
    }

    pub fn is_gpu(self) -> bool {
        matches!(self, Self::GpuNvidia | Self::GpuAmd | Self::GpuIntel)
    }
}

impl fmt::Display for HardwareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cpu => "Cpu",
            Self::GpuNvidia => "GpuNvidia",
            Self::GpuAmd => "GpuAmd",
            Self::GpuIntel => "GpuIntel",
            Self::Motherboard => "Motherboard",
            Self::SuperIo => "SuperIO",
            Self::Memory => "Memory",
            Self::Storage => "Storage",
            Self::Network => "Network",
            Self::Cooler => "Cooler",
            Self::EmbeddedController => "EmbeddedController",
            Self::Psu => "Psu",
            Self::Battery => "Battery",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

// ──────────────────────────────────────────────
// Sensores
// ──────────────────────────────────────────────

/// Tipo de medição de um sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Voltage,
    Current,
    Power,
    Clock,
    Temperature,
    Load,
    Frequency,
    Fan,
    Flow,
    Control,
    Level,
    Factor,
    Data,
    SmallData,
    Throughput,
    Energy,
    Noise,
}

impl SensorKind {
    /// Converte a string `SensorType` do LHM. Retorna `None` para tipos
    /// que não conhecemos.
    pub fn from_lhm(value: &str) -> Option<Self> {
        let kind = match value {
            "Voltage" => Self::Voltage,
            "Current" => Self::Current,
            "Power" => Self::Power,
            "Clock" => Self::Clock,
            "Temperature" => Self::Temperature,
            "Load" => Self::Load,
            "Frequency" => Self::Frequency,
            "Fan" => Self::Fan,
            "Flow" => Self::Flow,
            "Control" => Self::Control,
            "Level" => Self::Level,
            "Factor" => Self::Factor,
            "Data" => Self::Data,
            "SmallData" => Self::SmallData,
            "Throughput" => Self::Throughput,
            "Energy" => Self::Energy,
            "Noise" => Self::Noise,
            _ => return None,
        };
        Some(kind)
    }
}

/// Leitura de um sensor, válida apenas no ciclo em que foi obtida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub name: String,
    pub kind: SensorKind,
    /// `None` quando o driver não reportou valor neste ciclo
    pub value: Option<f32>,
}

impl SensorReading {
    pub fn new(name: impl Into<String>, kind: SensorKind, value: Option<f32>) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }
}

// ──────────────────────────────────────────────
// Snapshot
// ──────────────────────────────────────────────

/// Registro completo de telemetria de um ciclo.
///
/// A ordem dos campos é a ordem serializada na linha JSON.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TelemetrySnapshot {
    /// Temperatura do core da GPU (°C)
    pub gpu_core_temp_c: f64,
    /// Temperatura do hot spot da GPU (°C)
    pub gpu_hot_spot_temp_c: f64,
    /// Potência do pacote da GPU (W)
    pub gpu_power_watts: f64,
    /// Temperatura Tctl/Tdie da CPU (°C)
    pub cpu_core_temp_c: f64,
    /// Temperatura do CCD1 (°C)
    pub cpu_ccd_temp_c: f64,
    /// Potência do pacote da CPU (W)
    pub cpu_package_power_watts: f64,
}

impl TelemetrySnapshot {
    /// Potência somada de GPU e CPU (W).
    pub fn combined_power_watts(&self) -> f64 {
        self.gpu_power_watts + self.cpu_package_power_watts
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
