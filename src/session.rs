use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::Month;
use tracing::{debug, info};

use crate::aggregate;
use crate::classify;
use crate::error::Result;
use crate::ingest::{self, DatasetId, UploadedFile};
use crate::models::EnrichedReading;
use crate::report::DashboardView;

/// Current filter choices.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub month: Month,
    pub device: Option<String>,
    pub show_raw: bool,
}

struct Loaded {
    fingerprint: u64,
    id: DatasetId,
    skipped: Vec<String>,
    data: Vec<EnrichedReading>,
}

#[derive(Default)]
pub struct Session {
    loaded: Option<Loaded>,
    month: Option<Month>,
    device: Option<String>,
    show_raw: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dataset with `files`. Re-uploading an identical file set
    /// keeps the cached enrichment and its id.
    pub fn upload(&mut self, files: &[UploadedFile]) -> Result<DatasetId> {
        let fingerprint = fingerprint(files);
        if let Some(loaded) = &self.loaded {
            if loaded.fingerprint == fingerprint {
                debug!("Upload unchanged, reusing dataset {:?}", loaded.id);
                return Ok(loaded.id);
            }
        }

        let dataset = ingest::load(files)?;
        let data = classify::enrich(&dataset.readings);

        let months = aggregate::available_months(&data);
        if !self.month.is_some_and(|m| months.contains(&m)) {
            self.month = months.first().copied();
        }
        if let Some(device) = &self.device {
            if !data.iter().any(|row| row.device() == device) {
                self.device = None;
            }
        }

        info!("Dataset {:?} ready with {} rows", dataset.id, data.len());
        self.loaded = Some(Loaded {
            fingerprint,
            id: dataset.id,
            skipped: dataset.skipped,
            data,
        });
        Ok(dataset.id)
    }

    pub fn dataset_id(&self) -> Option<DatasetId> {
        self.loaded.as_ref().map(|l| l.id)
    }

    /// Enriched rows of the current dataset; empty before the first upload.
    pub fn data(&self) -> &[EnrichedReading] {
        self.loaded.as_ref().map(|l| l.data.as_slice()).unwrap_or(&[])
    }

    pub fn skipped(&self) -> &[String] {
        self.loaded.as_ref().map(|l| l.skipped.as_slice()).unwrap_or(&[])
    }

    pub fn months(&self) -> Vec<Month> {
        aggregate::available_months(self.data())
    }

    pub fn devices(&self) -> Vec<String> {
        aggregate::available_devices(self.data())
    }

    pub fn select_month(&mut self, month: Month) {
        self.month = Some(month);
    }

    pub fn select_device(&mut self, device: Option<String>) {
        self.device = device;
    }

    pub fn set_show_raw(&mut self, show_raw: bool) {
        self.show_raw = show_raw;
    }

    /// `None` until a month is known.
    pub fn selection(&self) -> Option<Selection> {
        self.month.map(|month| Selection {
            month,
            device: self.device.clone(),
            show_raw: self.show_raw,
        })
    }

    pub fn view(&self) -> Option<DashboardView> {
        self.loaded.as_ref()?;
        let selection = self.selection()?;
        Some(DashboardView::build(self.data(), &selection))
    }
}

fn fingerprint(files: &[UploadedFile]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for file in files {
        file.name.hash(&mut hasher);
        file.data.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TelemetryError;

    fn upload_file(name: &str, rows: &[&str]) -> UploadedFile {
        let mut body = "L1#,Last Signal,Battery,Signal\n".to_string();
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        UploadedFile::new(name, body)
    }

    #[test]
    fn upload_selects_earliest_month() {
        let mut session = Session::new();
        session
            .upload(&[upload_file(
                "a.csv",
                &[
                    r#"A1,"01/05/2024, 10:00:00",4,25"#,
                    r#"A1,"01/02/2024, 10:00:00",4,25"#,
                ],
            )])
            .unwrap();

        assert_eq!(session.selection().map(|s| s.month), Some(Month::February));
        assert_eq!(session.months(), vec![Month::February, Month::May]);
    }

    #[test]
    fn identical_upload_reuses_dataset() {
        let mut session = Session::new();
        let files = [upload_file("a.csv", &[r#"A1,"01/03/2024, 10:00:00",4,25"#])];
        let first = session.upload(&files).unwrap();
        let second = session.upload(&files).unwrap();
        assert_eq!(first, second);

        let changed = [upload_file("a.csv", &[r#"A1,"02/03/2024, 10:00:00",4,25"#])];
        assert_ne!(session.upload(&changed).unwrap(), first);
    }

    #[test]
    fn failed_upload_keeps_previous_dataset() {
        let mut session = Session::new();
        let id = session
            .upload(&[upload_file("a.csv", &[r#"A1,"01/03/2024, 10:00:00",4,25"#])])
            .unwrap();

        let err = session
            .upload(&[upload_file("b.csv", &["A1,not a date,4,25"])])
            .unwrap_err();
        assert!(matches!(err, TelemetryError::TimestampParse { .. }));
        assert_eq!(session.dataset_id(), Some(id));
        assert_eq!(session.data().len(), 1);
    }

    #[test]
    fn selection_changes_only_rerun_aggregation() {
        let mut session = Session::new();
        session
            .upload(&[upload_file(
                "a.csv",
                &[
                    r#"A1,"01/03/2024, 10:00:00",1,25"#,
                    r#"B2,"01/03/2024, 10:00:00",4,25"#,
                ],
            )])
            .unwrap();
        let id = session.dataset_id();

        session.select_device(Some("B2".to_string()));
        session.set_show_raw(true);
        let view = session.view().unwrap();

        assert_eq!(session.dataset_id(), id);
        assert_eq!(view.raw.map(|rows| rows.len()), Some(1));
        assert_eq!(view.summary.len(), 2);
    }

    #[test]
    fn unknown_month_yields_empty_view() {
        let mut session = Session::new();
        session
            .upload(&[upload_file("a.csv", &[r#"A1,"01/03/2024, 10:00:00",1,25"#])])
            .unwrap();
        session.select_month(Month::December);

        let view = session.view().unwrap();
        assert!(view.summary.is_empty());
        assert!(view.series.is_empty());
    }

    #[test]
    fn no_view_before_upload() {
        let session = Session::new();
        assert!(session.view().is_none());
        assert!(session.data().is_empty());
    }

    #[test]
    fn stale_device_selection_is_cleared() {
        let mut session = Session::new();
        session.select_device(Some("Z9".to_string()));
        session
            .upload(&[upload_file("a.csv", &[r#"A1,"01/03/2024, 10:00:00",1,25"#])])
            .unwrap();
        assert_eq!(session.selection().and_then(|s| s.device), None);
    }
}
