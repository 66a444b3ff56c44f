use std::fmt::Write;

use chrono::Month;
use serde::Serialize;

use crate::aggregate;
use crate::models::{serialize_month, DeviceMonthSummary, EnrichedReading, StatusCounts, TimeSeries};
use crate::session::Selection;

/// Cell styling for an error percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    StrongWarning,
    Caution,
    None,
}

/// `> 49` is a strong warning, `2..=48` a caution; anything else (NaN
/// included) is unstyled.
pub fn highlight(pct: f64) -> Highlight {
    if pct > 49.0 {
        Highlight::StrongWarning
    } else if (2.0..=48.0).contains(&pct) {
        Highlight::Caution
    } else {
        Highlight::None
    }
}

pub fn format_percentage(pct: f64) -> String {
    if pct.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}", pct)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PercentCell {
    pub value: f64,
    pub text: String,
    pub highlight: Highlight,
}

impl PercentCell {
    fn new(value: f64) -> Self {
        Self {
            value,
            text: format_percentage(value),
            highlight: highlight(value),
        }
    }

    fn markdown(&self) -> String {
        match self.highlight {
            Highlight::StrongWarning => format!("**{}%**", self.text),
            Highlight::Caution => format!("_{}%_", self.text),
            Highlight::None if self.value.is_nan() => self.text.clone(),
            Highlight::None => format!("{}%", self.text),
        }
    }
}

/// One rendered row of the per-device table. `index` starts at 1.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub index: usize,
    pub device: String,
    pub replace: PercentCell,
    pub battery_error: PercentCell,
    pub signal_error: PercentCell,
}

pub fn summary_rows(summaries: &[DeviceMonthSummary]) -> Vec<SummaryRow> {
    summaries
        .iter()
        .enumerate()
        .map(|(idx, s)| SummaryRow {
            index: idx + 1,
            device: s.device.clone(),
            replace: PercentCell::new(s.replace_pct),
            battery_error: PercentCell::new(s.battery_error_pct),
            signal_error: PercentCell::new(s.signal_error_pct),
        })
        .collect()
}

/// Everything the dashboard draws for one selection.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    #[serde(serialize_with = "serialize_month")]
    pub month: Month,
    pub device: Option<String>,
    pub series: TimeSeries,
    pub summary: Vec<SummaryRow>,
    pub status_counts: StatusCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<EnrichedReading>>,
}

impl DashboardView {
    pub fn build(data: &[EnrichedReading], selection: &Selection) -> Self {
        let device = selection.device.as_deref();
        let raw = selection.show_raw.then(|| {
            aggregate::filter_rows(data, selection.month, device)
                .into_iter()
                .cloned()
                .collect()
        });

        Self {
            month: selection.month,
            device: selection.device.clone(),
            series: aggregate::time_series(data, selection.month, device),
            summary: summary_rows(&aggregate::error_summary(data, selection.month)),
            status_counts: aggregate::status_counts(data, selection.month, device),
            raw,
        }
    }
}

pub fn build_report(view: &DashboardView) -> String {
    let mut output = String::new();
    let device_label = view.device.as_deref().unwrap_or("all devices");

    let _ = writeln!(output, "# Device Telemetry Report");
    let _ = writeln!(output, "Generated for {} ({})", view.month.name(), device_label);
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## Devices to Replace along with Error Percentages for {}",
        view.month.name()
    );

    if view.summary.is_empty() {
        let _ = writeln!(output, "No readings recorded for this month.");
    } else {
        let _ = writeln!(
            output,
            "| # | Device | Percentage of REPLACE | Battery Error Percentage | Signal Error Percentage |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|");
        for row in &view.summary {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} |",
                row.index,
                row.device,
                row.replace.markdown(),
                row.battery_error.markdown(),
                row.signal_error.markdown()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Averages");

    if view.series.is_empty() {
        let _ = writeln!(output, "No readings recorded for this selection.");
    } else {
        for (battery, signal) in view.series.battery.iter().zip(&view.series.signal) {
            let _ = writeln!(
                output,
                "- {}: battery {:.2}, signal {:.2}",
                battery.date, battery.value, signal.value
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Counts");

    if view.status_counts.is_empty() {
        let _ = writeln!(output, "No readings recorded for this selection.");
    } else {
        let counts = &view.status_counts;
        let battery: Vec<String> = counts.battery.iter().map(|(k, v)| format!("{k} {v}")).collect();
        let signal: Vec<String> = counts.signal.iter().map(|(k, v)| format!("{k} {v}")).collect();
        let verdict: Vec<String> = counts.verdict.iter().map(|(k, v)| format!("{k} {v}")).collect();
        let _ = writeln!(output, "- Battery Modem: {}", battery.join(", "));
        let _ = writeln!(output, "- Signal Strength: {}", signal.join(", "));
        let _ = writeln!(output, "- Analysis: {}", verdict.join(", "));
    }

    if let Some(raw) = &view.raw {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Filtered Data");
        for row in raw {
            let _ = writeln!(
                output,
                "- {} {} battery {} ({}) signal {} ({}) {}",
                row.device(),
                row.reading.last_signal,
                row.reading.battery,
                row.battery_status,
                row.reading.signal,
                row.signal_status,
                row.verdict
            );
        }
    }

    output
}
