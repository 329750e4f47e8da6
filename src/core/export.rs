// EventReport - core/export.rs
//
// CSV report of event records (plus a JSON rendering for previews).
// Core layer: writes to any Write trait object; `write_report` is the
// only function that touches the filesystem.

use crate::core::model::EventRecord;
use crate::util::constants::{REPORT_FILE_EXTENSION, REPORT_FILE_PREFIX, REPORT_HEADER};
use crate::util::error::WriteError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// One report row, in column order. Field names match the header exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "DateTime")]
    pub date_time: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "EventID")]
    pub event_id: u16,
    #[serde(rename = "Category")]
    pub category: u16,
    #[serde(rename = "Message")]
    pub message: String,
}

impl From<&EventRecord> for ReportRow {
    fn from(record: &EventRecord) -> Self {
        Self {
            date_time: record.timestamp_text(),
            source: record.source().to_string(),
            event_id: record.event_id(),
            category: record.category(),
            message: record.message().to_string(),
        }
    }
}

/// Default report file name: `event_report_<host>.csv`, or
/// `event_report_<host>_<channel>.csv` when several channels are exported
/// side by side. Characters that are not safe in a file name become `_`.
pub fn report_file_name(host: &str, channel: Option<&str>) -> String {
    let mut stem = format!("{REPORT_FILE_PREFIX}{}", file_name_part(host));
    if let Some(channel) = channel {
        stem.push('_');
        stem.push_str(&file_name_part(channel));
    }
    format!("{stem}.{REPORT_FILE_EXTENSION}")
}

fn file_name_part(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\\')
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn line_terminator() -> csv::Terminator {
    if cfg!(windows) {
        csv::Terminator::CRLF
    } else {
        csv::Terminator::Any(b'\n')
    }
}

/// Write records as CSV: header row, then one row per record in input order.
///
/// An empty slice is rejected with `WriteError::EmptyResult` before
/// anything is written. `report_path` is only used for error context.
pub fn write_csv<W: Write>(
    records: &[EventRecord],
    writer: W,
    report_path: &Path,
) -> Result<usize, WriteError> {
    if records.is_empty() {
        return Err(WriteError::EmptyResult);
    }

    let csv_err = |e| WriteError::Csv {
        path: report_path.to_path_buf(),
        source: e,
    };

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(line_terminator())
        .from_writer(writer);

    csv_writer.write_record(REPORT_HEADER).map_err(csv_err)?;

    for record in records {
        csv_writer.serialize(ReportRow::from(record)).map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::Io {
        path: report_path.to_path_buf(),
        source: e,
    })?;

    Ok(records.len())
}

/// Write the report to `path`, creating or truncating the file.
///
/// The empty check runs first, so an empty result never leaves a
/// header-only file behind.
pub fn write_report(records: &[EventRecord], path: &Path) -> Result<usize, WriteError> {
    if records.is_empty() {
        return Err(WriteError::EmptyResult);
    }

    let file = File::create(path).map_err(|e| WriteError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let count = write_csv(records, BufWriter::new(file), path)?;

    tracing::info!(path = %path.display(), rows = count, "Report written");
    Ok(count)
}

/// Parse a report produced by `write_csv` back into rows.
pub fn read_report<R: Read>(reader: R) -> Result<Vec<ReportRow>, csv::Error> {
    csv::Reader::from_reader(reader).deserialize().collect()
}

/// Render records as a pretty-printed JSON array.
pub fn export_json<W: Write>(records: &[EventRecord], writer: W) -> Result<usize, WriteError> {
    serde_json::to_writer_pretty(writer, records).map_err(|e| WriteError::Json { source: e })?;
    Ok(records.len())
}
