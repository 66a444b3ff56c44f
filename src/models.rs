use std::collections::BTreeMap;
use std::fmt;

use chrono::{Month, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

/// One row of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub device: String,
    pub last_signal: NaiveDateTime,
    /// NaN when the cell was blank.
    pub battery: f64,
    /// NaN when the cell was blank.
    pub signal: f64,
    /// Columns beyond the required four, in header order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Good,
    Replace,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Good => "GOOD",
            Verdict::Replace => "REPLACE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A reading with its derived classification fields.
///
/// Only `classify::enrich` builds these, so the derived fields always agree
/// with the source values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedReading {
    #[serde(flatten)]
    pub reading: Reading,
    pub battery_status: Status,
    pub signal_status: Status,
    pub verdict: Verdict,
    #[serde(serialize_with = "serialize_month")]
    pub month: Month,
}

impl EnrichedReading {
    pub fn device(&self) -> &str {
        &self.reading.device
    }

    pub fn date(&self) -> NaiveDate {
        self.reading.last_signal.date()
    }

    /// Drop the derived fields, returning the source reading.
    pub fn into_reading(self) -> Reading {
        self.reading
    }
}

/// Error rates for one device over one month.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceMonthSummary {
    pub device: String,
    #[serde(serialize_with = "serialize_month")]
    pub month: Month,
    pub rows: usize,
    pub battery_error_pct: f64,
    pub signal_error_pct: f64,
    pub replace_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Per-date means of battery and signal, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    pub battery: Vec<TimeSeriesPoint>,
    pub signal: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn is_empty(&self) -> bool {
        self.battery.is_empty() && self.signal.is_empty()
    }
}

/// Label counts for the three categorical fields. Labels with no rows are
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub battery: BTreeMap<Status, usize>,
    pub signal: BTreeMap<Status, usize>,
    pub verdict: BTreeMap<Verdict, usize>,
}

impl StatusCounts {
    pub fn is_empty(&self) -> bool {
        self.battery.is_empty() && self.signal.is_empty() && self.verdict.is_empty()
    }
}

pub(crate) fn serialize_month<S: Serializer>(
    month: &Month,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(month.name())
}
