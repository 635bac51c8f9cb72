//! Session summary export
//!
//! A summary is computed from one buffer snapshot and written as a two-row
//! CSV file: a fixed header and a single data row. Numerics are rounded to
//! two decimals.
//!
//! # Record Format
//!
//! ```text
//! Date,Time,Minimum pulse,Average pulse,Maximum pulse,Minimum EMG,Average EMG,Maximum EMG
//! 2024-03-01,14:02:55,58.06,71.43,83.33,401.00,512.37,798.00
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use cardioscope_core::math;
use cardioscope_core::types::SamplingConfig;

use crate::processing::PeakDetector;

/// Column names of the export record, in order.
pub const RECORD_HEADER: [&str; 8] = [
    "Date",
    "Time",
    "Minimum pulse",
    "Average pulse",
    "Maximum pulse",
    "Minimum EMG",
    "Average EMG",
    "Maximum EMG",
];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while exporting or reading a session record.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The sample buffer was empty
    #[error("Nothing to export: the sample buffer is empty")]
    NothingToExport,

    /// No destination path was supplied
    #[error("No export destination given")]
    NoDestination,

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The file has a header but no data row
    #[error("Record file has no data row")]
    MissingRecord,

    /// A column could not be parsed
    #[error("Invalid value {value:?} in column {column:?}")]
    InvalidField {
        /// Column name
        column: &'static str,
        /// Offending text
        value: String,
    },
}

// ============================================================================
// Summary
// ============================================================================

/// Statistics describing one exported session window.
///
/// BPM fields are `0.0` when the window had fewer than two peaks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Local wall-clock time of the export
    pub timestamp: NaiveDateTime,
    /// Slowest instantaneous heart rate
    pub min_bpm: f64,
    /// Mean instantaneous heart rate
    pub avg_bpm: f64,
    /// Fastest instantaneous heart rate
    pub max_bpm: f64,
    /// Smallest raw sample
    pub min_amplitude: f64,
    /// Mean raw sample
    pub avg_amplitude: f64,
    /// Largest raw sample
    pub max_amplitude: f64,
}

impl SessionSummary {
    /// Numeric fields in record order.
    fn values(&self) -> [f64; 6] {
        [
            self.min_bpm,
            self.avg_bpm,
            self.max_bpm,
            self.min_amplitude,
            self.avg_amplitude,
            self.max_amplitude,
        ]
    }

    /// Copy with every numeric field rounded to two decimals.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            timestamp: self.timestamp,
            min_bpm: math::round2(self.min_bpm),
            avg_bpm: math::round2(self.avg_bpm),
            max_bpm: math::round2(self.max_bpm),
            min_amplitude: math::round2(self.min_amplitude),
            avg_amplitude: math::round2(self.avg_amplitude),
            max_amplitude: math::round2(self.max_amplitude),
        }
    }

    /// Data row as written to the CSV file.
    #[must_use]
    pub fn to_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(RECORD_HEADER.len());
        record.push(self.timestamp.format(DATE_FORMAT).to_string());
        record.push(self.timestamp.format(TIME_FORMAT).to_string());
        record.extend(self.values().iter().map(|v| format!("{v:.2}")));
        record
    }

    /// Parse a data row.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidField`] for a missing or unparsable column.
    pub fn from_record(record: &csv::StringRecord) -> Result<Self, ExportError> {
        fn invalid(idx: usize, value: &str) -> ExportError {
            ExportError::InvalidField {
                column: RECORD_HEADER[idx],
                value: value.to_string(),
            }
        }
        let field = |idx: usize| record.get(idx).map(str::trim).ok_or_else(|| invalid(idx, ""));

        let date_text = field(0)?;
        let date = NaiveDate::parse_from_str(date_text, DATE_FORMAT)
            .map_err(|_| invalid(0, date_text))?;
        let time_text = field(1)?;
        let time = NaiveTime::parse_from_str(time_text, TIME_FORMAT)
            .map_err(|_| invalid(1, time_text))?;

        let mut values = [0.0; 6];
        for (offset, slot) in values.iter_mut().enumerate() {
            let idx = offset + 2;
            let text = field(idx)?;
            *slot = text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid(idx, text))?;
        }

        let [min_bpm, avg_bpm, max_bpm, min_amplitude, avg_amplitude, max_amplitude] = values;
        Ok(Self {
            timestamp: date.and_time(time),
            min_bpm,
            avg_bpm,
            max_bpm,
            min_amplitude,
            avg_amplitude,
            max_amplitude,
        })
    }
}

// ============================================================================
// Exporter
// ============================================================================

/// Computes and writes session summaries.
#[derive(Copy, Clone, Debug, Default)]
pub struct SessionExporter {
    detector: PeakDetector,
}

impl SessionExporter {
    /// Create an exporter using the same peak detector as the live view.
    #[must_use]
    pub fn new(detector: PeakDetector) -> Self {
        Self { detector }
    }

    /// Summarize a snapshot, timestamped with the current local time.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NothingToExport`] for an empty snapshot.
    pub fn compute_summary(
        &self,
        snapshot: &[f64],
        config: &SamplingConfig,
    ) -> Result<SessionSummary, ExportError> {
        self.compute_summary_at(snapshot, config, Local::now().naive_local())
    }

    /// Summarize a snapshot with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NothingToExport`] for an empty snapshot.
    pub fn compute_summary_at(
        &self,
        snapshot: &[f64],
        config: &SamplingConfig,
        timestamp: NaiveDateTime,
    ) -> Result<SessionSummary, ExportError> {
        let (Some(min_amplitude), Some(max_amplitude)) = (math::min(snapshot), math::max(snapshot))
        else {
            return Err(ExportError::NothingToExport);
        };

        let heart_rate = self.detector.heart_rate(snapshot, config);

        Ok(SessionSummary {
            timestamp,
            min_bpm: heart_rate.min_bpm().unwrap_or(0.0),
            avg_bpm: heart_rate.average_bpm().unwrap_or(0.0),
            max_bpm: heart_rate.max_bpm().unwrap_or(0.0),
            min_amplitude,
            avg_amplitude: math::mean(snapshot),
            max_amplitude,
        })
    }

    /// Write `summary` to `destination`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoDestination`] when `destination` is `None`,
    /// or an I/O or CSV error if the file cannot be written.
    pub fn export(
        &self,
        summary: &SessionSummary,
        destination: Option<&Path>,
    ) -> Result<PathBuf, ExportError> {
        let path = destination.ok_or(ExportError::NoDestination)?;

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(RECORD_HEADER)?;
        writer.write_record(summary.to_record())?;
        writer.flush()?;

        info!("Exported session summary to {}", path.display());
        Ok(path.to_path_buf())
    }

    /// Summarize `snapshot` and write it in one step.
    ///
    /// Nothing is written when the snapshot is empty or the destination is
    /// missing.
    ///
    /// # Errors
    ///
    /// See [`Self::compute_summary`] and [`Self::export`].
    pub fn export_snapshot(
        &self,
        snapshot: &[f64],
        config: &SamplingConfig,
        destination: Option<&Path>,
    ) -> Result<(SessionSummary, PathBuf), ExportError> {
        let summary = self.compute_summary(snapshot, config)?;
        let path = self.export(&summary, destination)?;
        Ok((summary, path))
    }
}

/// Read a record written by [`SessionExporter::export`].
///
/// # Errors
///
/// Returns an error if the file cannot be read, has no data row, or holds an
/// unparsable column.
pub fn read_record(path: &Path) -> Result<SessionSummary, ExportError> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);

    let record = reader
        .records()
        .next()
        .ok_or(ExportError::MissingRecord)??;
    debug!("Read {} columns from {}", record.len(), path.display());

    SessionSummary::from_record(&record)
}

// ============================================================================
// Tests
// ============================================================================
