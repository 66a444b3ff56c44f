use thiserror::Error;

/// Errors produced while ingesting telemetry uploads.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The upload is not a delimited-text file. Never fatal: `load` records
    /// the name in `Dataset::skipped` instead of returning this.
    #[error("Unrecognized file format: {name}")]
    UnrecognizedFileFormat { name: String },

    /// None of the uploaded files were accepted.
    #[error("No data: no CSV files were uploaded")]
    EmptyInput,

    /// A required column is missing from one file's header row.
    #[error("{file}: missing required column `{column}`")]
    Schema { file: String, column: String },

    /// A `Last Signal` value does not match `DD/MM/YYYY, HH:MM:SS`.
    #[error("{file}, line {line}: invalid timestamp `{value}`")]
    TimestampParse {
        file: String,
        line: u64,
        value: String,
    },

    /// A non-empty numeric cell could not be read as a number.
    #[error("{file}, line {line}: column `{column}` is not a number: `{value}`")]
    InvalidNumber {
        file: String,
        line: u64,
        column: String,
        value: String,
    },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TelemetryError {
    /// True for errors that abort the whole batch.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TelemetryError::UnrecognizedFileFormat { .. })
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_missing_column() {
        let err = TelemetryError::Schema {
            file: "march.csv".to_string(),
            column: "Battery".to_string(),
        };
        assert_eq!(err.to_string(), "march.csv: missing required column `Battery`");
    }

    #[test]
    fn timestamp_error_carries_offending_value() {
        let err = TelemetryError::TimestampParse {
            file: "march.csv".to_string(),
            line: 4,
            value: "2024-03-01 10:00".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 4"));
        assert!(msg.contains("2024-03-01 10:00"));
    }

    #[test]
    fn only_unrecognized_format_is_non_fatal() {
        let skipped = TelemetryError::UnrecognizedFileFormat {
            name: "notes.xlsx".to_string(),
        };
        assert!(!skipped.is_fatal());
        assert!(TelemetryError::EmptyInput.is_fatal());
    }

    #[test]
    fn io_errors_convert() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TelemetryError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }
}
