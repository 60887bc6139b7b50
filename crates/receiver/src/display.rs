//! Estado e renderização do display (título + 4 linhas).

use std::fmt;
use std::str::FromStr;
use telemetry_core::protocol::{decode_line, ProtocolError};
use telemetry_core::types::TelemetrySnapshot;

/// Página exibida.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPage {
    Gpu,
    Cpu,
    Other,
}

impl FromStr for DisplayPage {
    type Err = String;

    /// Aceita o nome da página ou o botão correspondente (`a`, `b`, `c`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gpu" | "a" => Ok(Self::Gpu),
            "cpu" | "b" => Ok(Self::Cpu),
            "other" | "c" => Ok(Self::Other),
            other => Err(format!("Página desconhecida: '{other}'")),
        }
    }
}

/// Conteúdo de uma tela.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub title: String,
    pub rows: [String; 4],
}

impl Screen {
    pub fn waiting() -> Self {
        Self {
            title: "Waiting...".into(),
            rows: Default::default(),
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Resultado de aplicar uma linha recebida.
#[derive(Debug)]
pub enum LineOutcome {
    Updated,
    /// Linha curta demais; o texto é o relato a devolver ao sender
    TooShort(String),
    Invalid(ProtocolError),
}

/// Últimos valores recebidos e página atual.
#[derive(Debug, Clone)]
pub struct DisplayState {
    page: DisplayPage,
    snapshot: TelemetrySnapshot,
    records: u64,
}

impl DisplayState {
    /// Começa com todos os valores em 0.0.
    pub fn new(page: DisplayPage) -> Self {
        Self {
            page,
            snapshot: TelemetrySnapshot::default(),
            records: 0,
        }
    }

    pub fn page(&self) -> DisplayPage {
        self.page
    }

    pub fn set_page(&mut self, page: DisplayPage) {
        self.page = page;
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Decodifica a linha e atualiza os valores. Linhas inválidas mantêm os
    /// valores anteriores.
    pub fn apply_line(&mut self, line: &str) -> LineOutcome {
        match decode_line(line) {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.records += 1;
                LineOutcome::Updated
            }
            Err(ProtocolError::TooShort(_)) => {
                LineOutcome::TooShort(format!("got short string: {}", line.trim()))
            }
            Err(e) => LineOutcome::Invalid(e),
        }
    }

    pub fn render(&self) -> Screen {
        let s = &self.snapshot;
        let total = s.combined_power_watts();
        match self.page {
            DisplayPage::Gpu => Screen {
                title: "GPU Info".into(),
                rows: [
                    format!("core: {:.1} C", s.gpu_core_temp_c),
                    format!("hot spot: {:.1} C", s.gpu_hot_spot_temp_c),
                    format!("power: {:.1} W", s.gpu_power_watts),
                    format!("+ cpu: {total:.1} W"),
                ],
            },
            DisplayPage::Cpu => Screen {
                title: "CPU Info".into(),
                rows: [
                    format!("core: {:.1} C", s.cpu_core_temp_c),
                    format!("ccd: {:.1} C", s.cpu_ccd_temp_c),
                    format!("power: {:.1} W", s.cpu_package_power_watts),
                    format!("+ gpu: {total:.1} W"),
                ],
            },
            DisplayPage::Other => Screen {
                title: "other".into(),
                rows: Default::default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "{\"GpuCoreTempC\":26,\"GpuHotSpotTempC\":34.34375,\"GpuPowerWatts\":27.809999465942383,\"CpuCoreTempC\":50.50000762939453,\"CpuCcdTempC\":35.75,\"CpuPackagePowerWatts\":36.78437042236328}";

    #[test]
    fn parses_pages_and_buttons() {
        assert_eq!("gpu".parse::<DisplayPage>(), Ok(DisplayPage::Gpu));
        assert_eq!("B".parse::<DisplayPage>(), Ok(DisplayPage::Cpu));
        assert_eq!(" other\n".parse::<DisplayPage>(), Ok(DisplayPage::Other));
        assert!("fans".parse::<DisplayPage>().is_err());
    }

    #[test]
    fn starts_with_zeroed_values() {
        let state = DisplayState::new(DisplayPage::Gpu);
        let screen = state.render();
        assert_eq!(screen.title, "GPU Info");
        assert_eq!(screen.rows[0], "core: 0.0 C");
        assert_eq!(state.records(), 0);
    }

    #[test]
    fn gpu_page_shows_gpu_values_and_total_power() {
        let mut state = DisplayState::new(DisplayPage::Gpu);
        assert!(matches!(state.apply_line(LINE), LineOutcome::Updated));
        let screen = state.render();
        assert_eq!(
            screen.rows,
            [
                "core: 26.0 C".to_string(),
                "hot spot: 34.3 C".to_string(),
                "power: 27.8 W".to_string(),
                "+ cpu: 64.6 W".to_string(),
            ]
        );
    }

    #[test]
    fn cpu_page_shows_cpu_values() {
        let mut state = DisplayState::new(DisplayPage::Cpu);
        state.apply_line(LINE);
        let screen = state.render();
        assert_eq!(screen.title, "CPU Info");
        assert_eq!(screen.rows[0], "core: 50.5 C");
        assert_eq!(screen.rows[1], "ccd: 35.8 C");
        assert_eq!(screen.rows[2], "power: 36.8 W");
        assert_eq!(screen.rows[3], "+ gpu: 64.6 W");
    }

    #[test]
    fn other_page_is_blank() {
        let mut state = DisplayState::new(DisplayPage::Gpu);
        state.apply_line(LINE);
        state.set_page(DisplayPage::Other);
        let screen = state.render();
        assert_eq!(screen.title, "other");
        assert!(screen.rows.iter().all(String::is_empty));
    }

    #[test]
    fn short_line_is_reported_and_ignored() {
        let mut state = DisplayState::new(DisplayPage::Gpu);
        state.apply_line(LINE);
        match state.apply_line("hi\r") {
            LineOutcome::TooShort(report) => assert_eq!(report, "got short string: hi"),
            other => panic!("esperado TooShort, veio {other:?}"),
        }
        assert_eq!(state.records(), 1);
        assert_eq!(state.render().rows[0], "core: 26.0 C");
    }

    #[test]
    fn invalid_json_keeps_previous_values() {
        let mut state = DisplayState::new(DisplayPage::Gpu);
        state.apply_line(LINE);
        assert!(matches!(
            state.apply_line("{\"GpuCoreTempC\": \"hot\"}"),
            LineOutcome::Invalid(_)
        ));
        assert_eq!(state.render().rows[0], "core: 26.0 C");
    }

    #[test]
    fn screen_renders_five_lines() {
        let text = Screen::waiting().to_string();
        assert_eq!(text.lines().count(), 5);
        assert!(text.starts_with("Waiting..."));
    }
}
