use std::collections::{BTreeMap, HashSet};

use chrono::{Month, NaiveDate};

use crate::models::{
    DeviceMonthSummary, EnrichedReading, Status, StatusCounts, TimeSeries, TimeSeriesPoint,
    Verdict,
};

/// `100 * hits / total`, NaN when `total` is zero.
pub fn percentage(hits: usize, total: usize) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        hits as f64 * 100.0 / total as f64
    }
}

fn in_scope(row: &EnrichedReading, month: Month, device: Option<&str>) -> bool {
    row.month == month && device.map_or(true, |d| row.device() == d)
}

/// Rows in the given month (and device, if any), in dataset order.
pub fn filter_rows<'a>(
    data: &'a [EnrichedReading],
    month: Month,
    device: Option<&str>,
) -> Vec<&'a EnrichedReading> {
    data.iter().filter(|row| in_scope(row, month, device)).collect()
}

/// Distinct device ids in first-seen order.
pub fn available_devices(data: &[EnrichedReading]) -> Vec<String> {
    let mut seen = HashSet::new();
    data.iter()
        .filter(|row| seen.insert(row.device()))
        .map(|row| row.device().to_string())
        .collect()
}

/// Distinct months present, in calendar order.
pub fn available_months(data: &[EnrichedReading]) -> Vec<Month> {
    let mut months: Vec<Month> = Vec::new();
    for row in data {
        if !months.contains(&row.month) {
            months.push(row.month);
        }
    }
    months.sort_by_key(|m| m.number_from_month());
    months
}

/// Arithmetic mean that ignores missing (NaN) values.
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        if !value.is_nan() {
            self.sum += value;
            self.count += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Per-date mean battery and signal for the rows in scope.
pub fn time_series(data: &[EnrichedReading], month: Month, device: Option<&str>) -> TimeSeries {
    let mut by_date: BTreeMap<NaiveDate, (Mean, Mean)> = BTreeMap::new();

    for row in data.iter().filter(|row| in_scope(row, month, device)) {
        let entry = by_date.entry(row.date()).or_default();
        entry.0.add(row.reading.battery);
        entry.1.add(row.reading.signal);
    }

    let mut series = TimeSeries::default();
    for (date, (battery, signal)) in by_date {
        series.battery.push(TimeSeriesPoint {
            date,
            value: battery.value(),
        });
        series.signal.push(TimeSeriesPoint {
            date,
            value: signal.value(),
        });
    }
    series
}

#[derive(Debug, Default)]
struct Tally {
    rows: usize,
    battery_errors: usize,
    signal_errors: usize,
    replace: usize,
}

/// One row per device seen in `month`, sorted by device id.
pub fn error_summary(data: &[EnrichedReading], month: Month) -> Vec<DeviceMonthSummary> {
    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();

    for row in data.iter().filter(|row| row.month == month) {
        let tally = tallies.entry(row.device()).or_default();
        tally.rows += 1;
        if row.battery_status == Status::Error {
            tally.battery_errors += 1;
        }
        if row.signal_status == Status::Error {
            tally.signal_errors += 1;
        }
        if row.verdict == Verdict::Replace {
            tally.replace += 1;
        }
    }

    tallies
        .into_iter()
        .map(|(device, tally)| DeviceMonthSummary {
            device: device.to_string(),
            month,
            rows: tally.rows,
            battery_error_pct: percentage(tally.battery_errors, tally.rows),
            signal_error_pct: percentage(tally.signal_errors, tally.rows),
            replace_pct: percentage(tally.replace, tally.rows),
        })
        .collect()
}

/// Label counts of the three categorical fields, for bar charts.
pub fn status_counts(data: &[EnrichedReading], month: Month, device: Option<&str>) -> StatusCounts {
    let mut counts = StatusCounts::default();

    for row in data.iter().filter(|row| in_scope(row, month, device)) {
        *counts.battery.entry(row.battery_status).or_insert(0) += 1;
        *counts.signal.entry(row.signal_status).or_insert(0) += 1;
        *counts.verdict.entry(row.verdict).or_insert(0) += 1;
    }

    counts
}
