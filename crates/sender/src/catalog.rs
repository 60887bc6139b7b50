//! Leitura de sensores nomeados no catálogo de hardware.
//!
//! Nada é cacheado: toda chamada lê o estado atual das unidades, que deve
//! ter sido atualizado por [`refresh_all`] no mesmo ciclo.

use crate::hardware::HardwareUnit;
use std::io::{self, Write};
use telemetry_core::types::{HardwareType, SensorKind};

/// Erros de leitura do catálogo.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("Hardware do tipo {0} não encontrado no computador")]
    HardwareNotFound(HardwareType),

    #[error("Sensor '{sensor}' não encontrado em {hardware}")]
    SensorNotFound { sensor: String, hardware: String },
}

/// Um sensor exigido: tipo da unidade, nome exato e tipo de medição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredSensor {
    pub hardware_type: HardwareType,
    pub name: &'static str,
    pub kind: SensorKind,
}

/// Atualiza todas as unidades e, recursivamente, suas sub-unidades.
///
/// Cada unidade é atualizada antes das suas filhas.
pub fn refresh_all(units: &mut [Box<dyn HardwareUnit>]) {
    for unit in units.iter_mut() {
        unit.update();
        refresh_all(unit.sub_hardware_mut());
    }
}

/// Primeira unidade de topo com o tipo pedido.
pub fn find_hardware(
    units: &[Box<dyn HardwareUnit>],
    hardware_type: HardwareType,
) -> Result<&dyn HardwareUnit, SensorError> {
    units
        .iter()
        .find(|unit| unit.hardware_type() == hardware_type)
        .map(|unit| &**unit)
        .ok_or(SensorError::HardwareNotFound(hardware_type))
}

/// Valor atual do primeiro sensor com nome e tipo exatos.
///
/// Sensor sem valor conta como ausente.
pub fn sensor_value(
    unit: &dyn HardwareUnit,
    name: &str,
    kind: SensorKind,
) -> Result<f32, SensorError> {
    unit.sensors()
        .iter()
        .filter(|s| s.kind == kind && s.name == name)
        .find_map(|s| s.value)
        .ok_or_else(|| SensorError::SensorNotFound {
            sensor: name.to_string(),
            hardware: unit.name().to_string(),
        })
}

/// Localiza a unidade e lê o sensor exigido.
pub fn read_sensor(
    units: &[Box<dyn HardwareUnit>],
    required: &RequiredSensor,
) -> Result<f32, SensorError> {
    let unit = find_hardware(units, required.hardware_type)?;
    sensor_value(unit, required.name, required.kind)
}

/// Escreve a árvore de unidades com as leituras atuais (`--list-sensors`).
pub fn write_tree(out: &mut dyn Write, units: &mut [Box<dyn HardwareUnit>]) -> io::Result<()> {
    write_level(out, units, 0)
}

fn write_level(out: &mut dyn Write, units: &mut [Box<dyn HardwareUnit>], depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    for unit in units.iter_mut() {
        writeln!(out, "{indent}[{}] {}", unit.hardware_type(), unit.name())?;
        for sensor in unit.sensors() {
            match sensor.value {
                Some(v) => writeln!(out, "{indent}  {:?} '{}' = {v:.2}", sensor.kind, sensor.name)?,
                None => writeln!(out, "{indent}  {:?} '{}' = -", sensor.kind, sensor.name)?,
            }
        }
        write_level(out, unit.sub_hardware_mut(), depth + 1)?;
    }
    Ok(())
}
