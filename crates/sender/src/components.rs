//! Backend portátil via `sysinfo::Components`.
//!
//! Expõe as temperaturas de hwmon/ACPI como unidades CPU/GPU, com os rótulos
//! do driver traduzidos para os nomes usados pelo LibreHardwareMonitor
//! (`k10temp Tctl` → `Core (Tctl/Tdie)`, `amdgpu junction` → `GPU Hot Spot`…).
//!
//! `sysinfo` não fornece potência, então os sensores `Package`/`GPU Package`
//! nunca aparecem por aqui e o backend serve apenas para `--list-sensors`.

use crate::hardware::{HardwareUnit, SensorBackend};
use std::cell::RefCell;
use std::rc::Rc;
use sysinfo::{Components, CpuRefreshKind, RefreshKind, System};
use telemetry_core::types::{HardwareType, SensorKind, SensorReading};
use tracing::{debug, info, warn};

const CPU_DRIVERS: [&str; 4] = ["k10temp", "coretemp", "zenpower", "cpu"];
const NVIDIA_DRIVERS: [&str; 2] = ["nouveau", "nvidia"];
const AMD_GPU_DRIVERS: [&str; 2] = ["amdgpu", "radeon"];
const INTEL_GPU_DRIVERS: [&str; 2] = ["i915", "xe"];

/// Tipo de hardware dono de um rótulo (pela primeira palavra, o driver).
fn classify(label: &str) -> Option<HardwareType> {
    let driver = label.split_whitespace().next()?.to_lowercase();
    let driver = driver.as_str();
    if CPU_DRIVERS.contains(&driver) {
        Some(HardwareType::Cpu)
    } else if NVIDIA_DRIVERS.contains(&driver) {
        Some(HardwareType::GpuNvidia)
    } else if AMD_GPU_DRIVERS.contains(&driver) {
        Some(HardwareType::GpuAmd)
    } else if INTEL_GPU_DRIVERS.contains(&driver) {
        Some(HardwareType::GpuIntel)
    } else {
        None
    }
}

/// Nome LHM equivalente ao rótulo do driver, quando existe.
fn canonical_name(hardware_type: HardwareType, label: &str) -> Option<&'static str> {
    let l = label.to_lowercase();
    if hardware_type == HardwareType::Cpu {
        if l.contains("tctl") || l.contains("tdie") || l.contains("package id 0") {
            Some("Core (Tctl/Tdie)")
        } else if l.contains("tccd1") {
            Some("CCD1 (Tdie)")
        } else {
            None
        }
    } else if hardware_type.is_gpu() {
        if l.contains("edge") || l.ends_with("temp1") {
            Some("GPU Core")
        } else if l.contains("junction") || l.contains("hotspot") {
            Some("GPU Hot Spot")
        } else {
            None
        }
    } else {
        None
    }
}

/// Unidade formada pelos componentes térmicos de um driver.
///
/// Todas as unidades compartilham a mesma lista de componentes; cada uma
/// atualiza só os seus índices.
pub struct ComponentUnit {
    hardware_type: HardwareType,
    name: String,
    components: Rc<RefCell<Components>>,
    indices: Vec<usize>,
    sensors: Vec<SensorReading>,
    sub: Vec<Box<dyn HardwareUnit>>,
}

impl HardwareUnit for ComponentUnit {
    fn hardware_type(&self) -> HardwareType {
        self.hardware_type
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn sensors(&self) -> &[SensorReading] {
        &self.sensors
    }

    fn sub_hardware_mut(&mut self) -> &mut [Box<dyn HardwareUnit>] {
        &mut self.sub
    }

    fn update(&mut self) {
        let hardware_type = self.hardware_type;
        let mut components = self.components.borrow_mut();
        let list = components.list_mut();
        let mut sensors = Vec::with_capacity(self.indices.len());
        for &i in &self.indices {
            let Some(c) = list.get_mut(i) else { continue };
            c.refresh();
            let name = canonical_name(hardware_type, c.label()).unwrap_or(c.label());
            sensors.push(SensorReading::new(name, SensorKind::Temperature, c.temperature()));
        }
        self.sensors = sensors;
    }
}

/// Agrupa os índices dos componentes por tipo de hardware, na ordem em que
/// cada tipo aparece.
fn group_by_type<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<(HardwareType, Vec<usize>)> {
    let mut groups: Vec<(HardwareType, Vec<usize>)> = Vec::new();
    for (i, label) in labels.into_iter().enumerate() {
        let Some(t) = classify(label) else { continue };
        match groups.iter_mut().find(|(g, _)| *g == t) {
            Some((_, indices)) => indices.push(i),
            None => groups.push((t, vec![i])),
        }
    }
    groups
}

/// Backend `sysinfo`, só para diagnóstico (`--list-sensors`).
pub struct ComponentsBackend {
    units: Vec<Box<dyn HardwareUnit>>,
}

impl ComponentsBackend {
    /// Enumera os componentes uma vez e cria uma unidade por tipo.
    pub fn new() -> Self {
        let components = Components::new_with_refreshed_list();
        for comp in components.iter() {
            debug!("Componente: {} ({:?}°C)", comp.label(), comp.temperature());
        }
        let groups = group_by_type(components.iter().map(|c| c.label()));

        let cpu_brand = {
            let sys = System::new_with_specifics(
                RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()),
            );
            sys.cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .filter(|b| !b.is_empty())
        };

        let shared = Rc::new(RefCell::new(components));
        let units: Vec<Box<dyn HardwareUnit>> = groups
            .into_iter()
            .map(|(t, indices)| {
                let name = match (t, &cpu_brand) {
                    (HardwareType::Cpu, Some(brand)) => brand.clone(),
                    _ => t.to_string(),
                };
                Box::new(ComponentUnit {
                    hardware_type: t,
                    name,
                    components: Rc::clone(&shared),
                    indices,
                    sensors: Vec::new(),
                    sub: Vec::new(),
                }) as Box<dyn HardwareUnit>
            })
            .collect();

        if units.is_empty() {
            warn!("✗ sysinfo: nenhum sensor térmico de CPU/GPU encontrado");
        } else {
            for unit in &units {
                info!("✓ sysinfo: {} ({})", unit.name(), unit.hardware_type());
            }
        }

        Self { units }
    }
}

impl Default for ComponentsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBackend for ComponentsBackend {
    fn name(&self) -> &'static str {
        "components"
    }

    fn hardware(&self) -> &[Box<dyn HardwareUnit>] {
        &self.units
    }

    fn hardware_mut(&mut self) -> &mut [Box<dyn HardwareUnit>] {
        &mut self.units
    }

    fn close(&mut self) {
        self.units.clear();
    }
}
