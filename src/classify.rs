use chrono::{Datelike, Month, NaiveDateTime};

use crate::models::{EnrichedReading, Reading, Status, Verdict};

/// Battery readings strictly between 0 and this value are errors.
pub const BATTERY_ERROR_BELOW: f64 = 3.0;

/// Signal readings strictly between 0 and this value are errors.
pub const SIGNAL_ERROR_BELOW: f64 = 20.0;

/// `0` and the bound itself are both OK; so is a missing (NaN) value.
fn status_for(value: f64, upper: f64) -> Status {
    if value > 0.0 && value < upper {
        Status::Error
    } else {
        Status::Ok
    }
}

pub fn battery_status(battery: f64) -> Status {
    status_for(battery, BATTERY_ERROR_BELOW)
}

pub fn signal_status(signal: f64) -> Status {
    status_for(signal, SIGNAL_ERROR_BELOW)
}

pub fn verdict(battery: Status, signal: Status) -> Verdict {
    match (battery, signal) {
        (Status::Ok, Status::Ok) => Verdict::Good,
        _ => Verdict::Replace,
    }
}

pub fn month_of(timestamp: &NaiveDateTime) -> Month {
    // month() is always 1..=12
    Month::try_from(timestamp.month() as u8).unwrap_or(Month::January)
}

pub fn enrich_one(reading: Reading) -> EnrichedReading {
    let battery_status = battery_status(reading.battery);
    let signal_status = signal_status(reading.signal);
    let month = month_of(&reading.last_signal);

    EnrichedReading {
        battery_status,
        signal_status,
        verdict: verdict(battery_status, signal_status),
        month,
        reading,
    }
}

/// Derive the classification fields and month for every reading.
pub fn enrich(readings: &[Reading]) -> Vec<EnrichedReading> {
    readings.iter().cloned().map(enrich_one).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_reading(battery: f64, signal: f64) -> Reading {
        Reading {
            device: "A1".to_string(),
            last_signal: NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            battery,
            signal,
            extra: Vec::new(),
        }
    }

    #[test]
    fn battery_boundaries() {
        assert_eq!(battery_status(0.0), Status::Ok);
        assert_eq!(battery_status(0.01), Status::Error);
        assert_eq!(battery_status(2.99), Status::Error);
        assert_eq!(battery_status(3.0), Status::Ok);
        assert_eq!(battery_status(-1.0), Status::Ok);
        assert_eq!(battery_status(12.0), Status::Ok);
        assert_eq!(battery_status(f64::NAN), Status::Ok);
    }

    #[test]
    fn signal_boundaries() {
        assert_eq!(signal_status(0.0), Status::Ok);
        assert_eq!(signal_status(1.0), Status::Error);
        assert_eq!(signal_status(19.9), Status::Error);
        assert_eq!(signal_status(20.0), Status::Ok);
        assert_eq!(signal_status(-5.0), Status::Ok);
        assert_eq!(signal_status(31.0), Status::Ok);
    }

    #[test]
    fn verdict_table() {
        assert_eq!(verdict(Status::Ok, Status::Ok), Verdict::Good);
        assert_eq!(verdict(Status::Error, Status::Ok), Verdict::Replace);
        assert_eq!(verdict(Status::Ok, Status::Error), Verdict::Replace);
        assert_eq!(verdict(Status::Error, Status::Error), Verdict::Replace);
    }

    #[test]
    fn month_uses_full_english_name() {
        let enriched = enrich_one(sample_reading(4.0, 25.0));
        assert_eq!(enriched.month, Month::March);
        assert_eq!(enriched.month.name(), "March");
    }

    #[test]
    fn enrich_sets_all_fields() {
        let enriched = enrich(&[sample_reading(1.5, 25.0), sample_reading(4.0, 25.0)]);
        assert_eq!(enriched[0].battery_status, Status::Error);
        assert_eq!(enriched[0].signal_status, Status::Ok);
        assert_eq!(enriched[0].verdict, Verdict::Replace);
        assert_eq!(enriched[1].verdict, Verdict::Good);
    }

    #[test]
    fn enrich_is_idempotent() {
        let readings = vec![
            sample_reading(0.0, 0.0),
            sample_reading(2.0, 10.0),
            sample_reading(3.0, 20.0),
        ];
        let once = enrich(&readings);
        let stripped: Vec<Reading> = once
            .iter()
            .cloned()
            .map(EnrichedReading::into_reading)
            .collect();
        assert_eq!(enrich(&stripped), once);
    }
}
