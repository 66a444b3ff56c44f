use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, TelemetryError};
use crate::models::Reading;

pub const DEVICE_COLUMN: &str = "L1#";
pub const TIMESTAMP_COLUMN: &str = "Last Signal";
pub const BATTERY_COLUMN: &str = "Battery";
pub const SIGNAL_COLUMN: &str = "Signal";

/// Literal `Last Signal` format, e.g. `14/03/2024, 09:30:00`.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Cell values read as a missing number, as spreadsheet and pandas exports
/// write them.
pub const MISSING_VALUE_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// An uploaded file: its display name and raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, data })
    }

    /// Only `.csv` uploads are treated as delimited text.
    pub fn is_delimited_text(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }
}

/// Identity of one successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetId(pub Uuid);

/// All readings from one upload batch, in file order then row order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: DatasetId,
    pub readings: Vec<Reading>,
    /// Names of uploads that were not recognized as CSV.
    pub skipped: Vec<String>,
}

impl Dataset {
    /// Reading at a row index of the unified set.
    pub fn get(&self, index: usize) -> Option<&Reading> {
        self.readings.get(index)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Parse and concatenate every CSV upload into one dataset.
pub fn load(files: &[UploadedFile]) -> Result<Dataset> {
    let mut readings = Vec::new();
    let mut skipped = Vec::new();
    let mut accepted = 0usize;

    for file in files {
        if !file.is_delimited_text() {
            let err = TelemetryError::UnrecognizedFileFormat {
                name: file.name.clone(),
            };
            warn!("Skipping upload: {}", err);
            skipped.push(file.name.clone());
            continue;
        }

        let rows = read_file(file)?;
        debug!("{}: {} rows", file.name, rows.len());
        readings.extend(rows);
        accepted += 1;
    }

    if accepted == 0 {
        return Err(TelemetryError::EmptyInput);
    }

    info!(
        "Loaded {} readings from {} files ({} skipped)",
        readings.len(),
        accepted,
        skipped.len()
    );

    Ok(Dataset {
        id: DatasetId(Uuid::new_v4()),
        readings,
        skipped,
    })
}

/// Convenience wrapper over [`load`] for files on disk.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Dataset> {
    let files = paths
        .iter()
        .map(|p| UploadedFile::from_path(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    load(&files)
}

/// Strict `DD/MM/YYYY, HH:MM:SS`. chrono lets a format space match any run
/// of whitespace, so the single `", "` separator is checked first.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let (date, time) = value.split_once(", ")?;
    if date.contains(char::is_whitespace) || time.contains(char::is_whitespace) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

fn read_file(file: &UploadedFile) -> Result<Vec<Reading>> {
    // Short rows are allowed; their missing cells read as blank.
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file.data.as_slice());

    let headers = reader.headers()?.clone();
    let columns = Columns::resolve(&file.name, &headers)?;

    let mut readings = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        readings.push(columns.parse_record(&file.name, line, &record)?);
    }

    Ok(readings)
}

/// Header positions of the required columns plus the passthrough ones.
struct Columns {
    device: usize,
    last_signal: usize,
    battery: usize,
    signal: usize,
    extra: Vec<(usize, String)>,
}

impl Columns {
    fn resolve(file: &str, headers: &StringRecord) -> Result<Self> {
        let names: Vec<&str> = headers.iter().map(normalize_header_name).collect();

        let find = |column: &str| {
            names
                .iter()
                .position(|name| *name == column)
                .ok_or_else(|| TelemetryError::Schema {
                    file: file.to_string(),
                    column: column.to_string(),
                })
        };

        let device = find(DEVICE_COLUMN)?;
        let last_signal = find(TIMESTAMP_COLUMN)?;
        let battery = find(BATTERY_COLUMN)?;
        let signal = find(SIGNAL_COLUMN)?;

        let required = [device, last_signal, battery, signal];
        let extra = names
            .iter()
            .enumerate()
            .filter(|(idx, _)| !required.contains(idx))
            .map(|(idx, name)| (idx, name.to_string()))
            .collect();

        Ok(Self {
            device,
            last_signal,
            battery,
            signal,
            extra,
        })
    }

    fn parse_record(&self, file: &str, line: u64, record: &StringRecord) -> Result<Reading> {
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let raw_ts = field(self.last_signal);
        let last_signal =
            parse_timestamp(raw_ts).ok_or_else(|| TelemetryError::TimestampParse {
                file: file.to_string(),
                line,
                value: raw_ts.to_string(),
            })?;

        let number = |idx: usize, column: &str| -> Result<f64> {
            let value = field(idx);
            if MISSING_VALUE_TOKENS.contains(&value) {
                return Ok(f64::NAN);
            }
            value.parse::<f64>().map_err(|_| TelemetryError::InvalidNumber {
                file: file.to_string(),
                line,
                column: column.to_string(),
                value: value.to_string(),
            })
        };

        Ok(Reading {
            device: field(self.device).to_string(),
            last_signal,
            battery: number(self.battery, BATTERY_COLUMN)?,
            signal: number(self.signal, SIGNAL_COLUMN)?,
            extra: self
                .extra
                .iter()
                .map(|(idx, name)| (name.clone(), field(*idx).to_string()))
                .collect(),
        })
    }
}

/// Spreadsheet exports often prefix the first header with a UTF-8 BOM.
fn normalize_header_name(name: &str) -> &str {
    name.trim().trim_start_matches('\u{feff}')
}
