//! Battery and signal error analysis for device telemetry exports.

pub mod aggregate;
pub mod classify;
pub mod error;
pub mod ingest;
pub mod models;
pub mod report;
pub mod session;

pub use error::{Result, TelemetryError};
pub use ingest::{load, Dataset, DatasetId, UploadedFile};
pub use models::{
    DeviceMonthSummary, EnrichedReading, Reading, Status, StatusCounts, TimeSeries,
    TimeSeriesPoint, Verdict,
};
pub use session::{Selection, Session};
