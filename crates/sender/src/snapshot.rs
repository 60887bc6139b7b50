//! Montagem do [`TelemetrySnapshot`] a partir dos sensores exigidos.

use crate::catalog::{read_sensor, RequiredSensor, SensorError};
use crate::hardware::HardwareUnit;
use std::io::{self, Write};
use telemetry_core::types::{HardwareType, SensorKind, TelemetrySnapshot};

const fn required(hardware_type: HardwareType, name: &'static str, kind: SensorKind) -> RequiredSensor {
    RequiredSensor {
        hardware_type,
        name,
        kind,
    }
}

pub const GPU_CORE_TEMP: RequiredSensor =
    required(HardwareType::GpuNvidia, "GPU Core", SensorKind::Temperature);
pub const GPU_HOT_SPOT_TEMP: RequiredSensor =
    required(HardwareType::GpuNvidia, "GPU Hot Spot", SensorKind::Temperature);
pub const GPU_PACKAGE_POWER: RequiredSensor =
    required(HardwareType::GpuNvidia, "GPU Package", SensorKind::Power);
pub const CPU_CCD_TEMP: RequiredSensor =
    required(HardwareType::Cpu, "CCD1 (Tdie)", SensorKind::Temperature);
pub const CPU_CORE_TEMP: RequiredSensor =
    required(HardwareType::Cpu, "Core (Tctl/Tdie)", SensorKind::Temperature);
pub const CPU_PACKAGE_POWER: RequiredSensor =
    required(HardwareType::Cpu, "Package", SensorKind::Power);

/// Campo do snapshot preenchido por um sensor exigido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotField {
    GpuCoreTemp,
    GpuHotSpotTemp,
    GpuPower,
    CpuCcdTemp,
    CpuCoreTemp,
    CpuPackagePower,
}

impl SnapshotField {
    fn slot(self, snapshot: &mut TelemetrySnapshot) -> &mut f64 {
        match self {
            Self::GpuCoreTemp => &mut snapshot.gpu_core_temp_c,
            Self::GpuHotSpotTemp => &mut snapshot.gpu_hot_spot_temp_c,
            Self::GpuPower => &mut snapshot.gpu_power_watts,
            Self::CpuCcdTemp => &mut snapshot.cpu_ccd_temp_c,
            Self::CpuCoreTemp => &mut snapshot.cpu_core_temp_c,
            Self::CpuPackagePower => &mut snapshot.cpu_package_power_watts,
        }
    }
}

/// Todos os sensores exigidos, na ordem em que são lidos (GPU primeiro).
pub const REQUIRED_SENSORS: [(RequiredSensor, SnapshotField); 6] = [
    (GPU_CORE_TEMP, SnapshotField::GpuCoreTemp),
    (GPU_HOT_SPOT_TEMP, SnapshotField::GpuHotSpotTemp),
    (GPU_PACKAGE_POWER, SnapshotField::GpuPower),
    (CPU_CCD_TEMP, SnapshotField::CpuCcdTemp),
    (CPU_CORE_TEMP, SnapshotField::CpuCoreTemp),
    (CPU_PACKAGE_POWER, SnapshotField::CpuPackagePower),
];

/// Monta o snapshot do ciclo ou falha no primeiro sensor ausente.
///
/// As unidades já devem ter sido atualizadas neste ciclo.
pub fn build_snapshot(units: &[Box<dyn HardwareUnit>]) -> Result<TelemetrySnapshot, SensorError> {
    let mut snapshot = TelemetrySnapshot::default();
    for (sensor, field) in &REQUIRED_SENSORS {
        *field.slot(&mut snapshot) = f64::from(read_sensor(units, sensor)?);
    }
    Ok(snapshot)
}

/// Escreve o estado de cada sensor exigido. Retorna quantos faltam.
pub fn write_required_status(out: &mut dyn Write, units: &[Box<dyn HardwareUnit>]) -> io::Result<usize> {
    let mut missing = 0;
    for (sensor, _) in &REQUIRED_SENSORS {
        match read_sensor(units, sensor) {
            Ok(v) => writeln!(out, "✓ {} '{}' = {v:.2}", sensor.hardware_type, sensor.name)?,
            Err(e) => {
                missing += 1;
                writeln!(out, "✗ {} '{}': {e}", sensor.hardware_type, sensor.name)?;
            }
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::fake::{amd_cpu, nvidia_gpu, FakeUnit};

    #[test]
    fn snapshot_matches_source_values() {
        let units = vec![amd_cpu().boxed(), nvidia_gpu().boxed()];
        let s = build_snapshot(&units).unwrap();
        assert_eq!(s.gpu_core_temp_c, 26.0);
        assert_eq!(s.gpu_hot_spot_temp_c, 34.34375);
        assert_eq!(s.gpu_power_watts, f64::from(27.81_f32));
        assert_eq!(s.cpu_core_temp_c, 50.5);
        assert_eq!(s.cpu_ccd_temp_c, 35.75);
        assert_eq!(s.cpu_package_power_watts, f64::from(36.78_f32));
    }

    #[test]
    fn missing_gpu_is_hardware_not_found() {
        let units = vec![amd_cpu().boxed()];
        assert_eq!(
            build_snapshot(&units),
            Err(SensorError::HardwareNotFound(HardwareType::GpuNvidia))
        );
    }

    #[test]
    fn amd_gpu_does_not_satisfy_nvidia_requirement() {
        let mut gpu = nvidia_gpu();
        gpu.hardware_type = HardwareType::GpuAmd;
        let units = vec![gpu.boxed(), amd_cpu().boxed()];
        assert_eq!(
            build_snapshot(&units),
            Err(SensorError::HardwareNotFound(HardwareType::GpuNvidia))
        );
    }

    #[test]
    fn missing_cpu_package_power_is_sensor_not_found() {
        let cpu = FakeUnit::new(HardwareType::Cpu, "AMD Ryzen 7 5800X3D")
            .with_sensor("Core (Tctl/Tdie)", SensorKind::Temperature, Some(50.5))
            .with_sensor("CCD1 (Tdie)", SensorKind::Temperature, Some(35.75));
        let units = vec![nvidia_gpu().boxed(), cpu.boxed()];
        assert_eq!(
            build_snapshot(&units),
            Err(SensorError::SensorNotFound {
                sensor: "Package".into(),
                hardware: "AMD Ryzen 7 5800X3D".into(),
            })
        );
    }

    #[test]
    fn gpu_errors_are_reported_before_cpu_errors() {
        let gpu = FakeUnit::new(HardwareType::GpuNvidia, "RTX");
        let units = vec![gpu.boxed()];
        assert!(matches!(
            build_snapshot(&units),
            Err(SensorError::SensorNotFound { sensor, .. }) if sensor == "GPU Core"
        ));
    }

    #[test]
    fn required_table_is_fixed() {
        assert_eq!(REQUIRED_SENSORS.len(), 6);
        let gpu = REQUIRED_SENSORS
            .iter()
            .filter(|(s, _)| s.hardware_type == HardwareType::GpuNvidia)
            .count();
        assert_eq!(gpu, 3);
        assert!(REQUIRED_SENSORS
            .iter()
            .take(3)
            .all(|(s, _)| s.hardware_type == HardwareType::GpuNvidia));
        assert!(REQUIRED_SENSORS.iter().any(|(s, f)| s.name == "Package"
            && s.kind == SensorKind::Power
            && *f == SnapshotField::CpuPackagePower));
    }

    #[test]
    fn each_field_is_filled_by_its_own_sensor() {
        let gpu = FakeUnit::new(HardwareType::GpuNvidia, "RTX")
            .with_sensor("GPU Core", SensorKind::Temperature, Some(1.0))
            .with_sensor("GPU Hot Spot", SensorKind::Temperature, Some(2.0))
            .with_sensor("GPU Package", SensorKind::Power, Some(3.0));
        let cpu = FakeUnit::new(HardwareType::Cpu, "Ryzen")
            .with_sensor("CCD1 (Tdie)", SensorKind::Temperature, Some(4.0))
            .with_sensor("Core (Tctl/Tdie)", SensorKind::Temperature, Some(5.0))
            .with_sensor("Package", SensorKind::Power, Some(6.0));
        let s = build_snapshot(&[gpu.boxed(), cpu.boxed()]).unwrap();
        assert_eq!(
            [
                s.gpu_core_temp_c,
                s.gpu_hot_spot_temp_c,
                s.gpu_power_watts,
                s.cpu_ccd_temp_c,
                s.cpu_core_temp_c,
                s.cpu_package_power_watts,
            ],
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn status_counts_missing_power_sensors() {
        let gpu = FakeUnit::new(HardwareType::GpuNvidia, "RTX")
            .with_sensor("GPU Core", SensorKind::Temperature, Some(40.0))
            .with_sensor("GPU Hot Spot", SensorKind::Temperature, Some(48.0));
        let cpu = FakeUnit::new(HardwareType::Cpu, "Ryzen")
            .with_sensor("CCD1 (Tdie)", SensorKind::Temperature, Some(35.0))
            .with_sensor("Core (Tctl/Tdie)", SensorKind::Temperature, Some(50.0));
        let mut out = Vec::new();
        let missing = write_required_status(&mut out, &[gpu.boxed(), cpu.boxed()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(missing, 2);
        assert_eq!(text.lines().count(), 6);
        assert_eq!(text.lines().filter(|l| l.starts_with('✗')).count(), 2);
    }
}
