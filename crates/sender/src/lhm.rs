//! Sensores via LibreHardwareMonitor WMI.
//!
//! Quando o LHM roda como admin ou serviço Windows, ele publica a árvore de
//! hardware e **todos** os sensores em `root\LibreHardwareMonitor`, com os
//! mesmos nomes exibidos na interface do LHM ("GPU Hot Spot", "CCD1 (Tdie)"…).
//!
//! ## Instalação do LHM como serviço
//! 1. Baixe LibreHardwareMonitor: <https://github.com/LibreHardwareMonitor/LibreHardwareMonitor>
//! 2. Execute como admin → Options → "Run On Windows Startup"
//!    **OU** instale como serviço via `sc create` / tarefa agendada.

use crate::hardware::{BackendError, HardwareUnit, SensorBackend};
use serde::Deserialize;
use std::collections::HashSet;
use std::rc::Rc;
use telemetry_core::types::{HardwareType, SensorKind, SensorReading};
use tracing::{debug, info, warn};
use wmi::{COMLibrary, WMIConnection};

const NAMESPACE: &str = "root\\LibreHardwareMonitor";

// ──────────────────────────────────────────────
// WMI structs de deserialização
// ──────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
struct LhmHardware {
    identifier: String,
    name: String,
    hardware_type: String,
    parent: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct LhmSensor {
    name: String,
    sensor_type: String,
    value: Option<f32>,
}

// ──────────────────────────────────────────────
// Unidade
// ──────────────────────────────────────────────

/// Uma entrada da classe `Hardware` do LHM.
pub struct LhmUnit {
    identifier: String,
    name: String,
    hardware_type: HardwareType,
    sensors: Vec<SensorReading>,
    sub: Vec<Box<dyn HardwareUnit>>,
    wmi: Rc<WMIConnection>,
}

impl HardwareUnit for LhmUnit {
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
        let query = format!(
            "SELECT Name, SensorType, Value FROM Sensor WHERE Parent = '{}'",
            self.identifier
        );
        match self.wmi.raw_query::<LhmSensor>(&query) {
            Ok(rows) => {
                self.sensors = rows
                    .into_iter()
                    .filter_map(|s| {
                        SensorKind::from_lhm(&s.sensor_type)
                            .map(|kind| SensorReading::new(s.name, kind, s.value))
                    })
                    .collect();
            }
            Err(e) => {
                debug!("LHM: falha ao ler sensores de {}: {e}", self.identifier);
                self.sensors.clear();
            }
        }
    }
}

/// Monta as unidades filhas de `parent` (vazio = topo).
fn build_tree(
    rows: &[LhmHardware],
    parent: &str,
    wmi: &Rc<WMIConnection>,
) -> Vec<Box<dyn HardwareUnit>> {
    let known: HashSet<&str> = rows.iter().map(|r| r.identifier.as_str()).collect();
    children_of(rows, parent, &known)
        .map(|row| {
            Box::new(LhmUnit {
                identifier: row.identifier.clone(),
                name: row.name.clone(),
                hardware_type: HardwareType::from_lhm(&row.hardware_type),
                sensors: Vec::new(),
                sub: build_tree(rows, &row.identifier, wmi),
                wmi: Rc::clone(wmi),
            }) as Box<dyn HardwareUnit>
        })
        .collect()
}

/// Linhas cujo pai é `parent`. No topo entram também as linhas cujo pai não
/// está na lista.
fn children_of<'a>(
    rows: &'a [LhmHardware],
    parent: &'a str,
    known: &'a HashSet<&'a str>,
) -> impl Iterator<Item = &'a LhmHardware> + 'a {
    rows.iter().filter(move |r| {
        if parent.is_empty() {
            r.parent.is_empty() || !known.contains(r.parent.as_str())
        } else {
            r.parent == parent
        }
    })
}

// ──────────────────────────────────────────────
// Backend
// ──────────────────────────────────────────────

/// Backend LibreHardwareMonitor.
pub struct LhmBackend {
    units: Vec<Box<dyn HardwareUnit>>,
}

impl LhmBackend {
    /// Conecta no namespace do LHM e carrega a árvore de hardware.
    pub fn try_new() -> Result<Self, BackendError> {
        let com = COMLibrary::new().map_err(|e| BackendError::Connect(e.to_string()))?;
        let wmi = WMIConnection::with_namespace_path(NAMESPACE, com)
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        let rows: Vec<LhmHardware> = wmi
            .raw_query("SELECT Identifier, Name, HardwareType, Parent FROM Hardware")
            .map_err(|e| BackendError::Connect(format!("LHM Hardware query: {e}")))?;

        if rows.is_empty() {
            warn!("✗ LHM WMI: namespace existe mas não publica hardware");
            return Err(BackendError::Unavailable("lhm"));
        }

        for row in &rows {
            debug!("LHM: {} [{}] {}", row.identifier, row.hardware_type, row.name);
        }
        info!("✓ LHM WMI: {} unidades de hardware", rows.len());

        let wmi = Rc::new(wmi);
        let units = build_tree(&rows, "", &wmi);
        Ok(Self { units })
    }
}

impl SensorBackend for LhmBackend {
    fn name(&self) -> &'static str {
        "lhm"
    }

    fn hardware(&self) -> &[Box<dyn HardwareUnit>] {
        &self.units
    }

    fn hardware_mut(&mut self) -> &mut [Box<dyn HardwareUnit>] {
        &mut self.units
    }

    fn close(&mut self) {
        // Solta as referências à conexão WMI
        self.units.clear();
    }
}
