// EventReport - tests/e2e_query.rs
//
// End-to-end tests for the query and export pipeline.
//
// A scripted in-memory log source stands in for the native event log; from
// there on everything is real: normalisation, filtering, the streaming
// engine, parallel channel queries, and CSV files on disk in a temp dir.

use eventreport::app::batch::run_channels;
use eventreport::app::query::{CancelToken, QueryEngine, QueryOptions};
use eventreport::core::export::{read_report, report_file_name, write_report};
use eventreport::core::filter::FilterCriteria;
use eventreport::core::model::{RawRecord, Severity};
use eventreport::core::source::{MemorySource, Scripted};
use eventreport::util::error::{ConnectionFailure, QueryError, ReadError, WriteError};
use std::fs;

// =============================================================================
// Helpers
// =============================================================================

fn raw(n: u32, event_type: u16, event_code: u32, source: &str, inserts: &[&str]) -> RawRecord {
    RawRecord {
        record_number: n,
        time_generated: 1_700_000_000 + i64::from(n) * 60,
        event_code,
        event_type,
        category: 0,
        source: source.to_string(),
        inserts: inserts.iter().map(|s| s.to_string()).collect(),
    }
}

/// A small Application log: two errors, a warning, and an information event.
fn application_log() -> Vec<Vec<RawRecord>> {
    vec![
        vec![
            raw(1, 4, 0x4000_1010, "Service Control Manager", &["Service", "started"]),
            raw(2, 1, 1000, "Application Error", &["Faulting application", "app.exe"]),
        ],
        vec![
            raw(3, 2, 2004, "Resource-Exhaustion-Detector", &["Low virtual memory"]),
            raw(4, 1, 1001, "Windows Error Reporting", &["Fault bucket, type 0"]),
        ],
    ]
}

// =============================================================================
// Query + export E2E
// =============================================================================

#[test]
fn e2e_filtered_query_written_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let source = MemorySource::new().with_batches("localhost", "Application", application_log());
    let stats = source.stats();
    let engine = QueryEngine::new(source);

    let criteria = FilterCriteria::match_all().with_severities([Severity::Error]);
    let records = engine.run("localhost", "Application", criteria).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(stats.closes(), 1);

    let path = dir.path().join(report_file_name("localhost", None));
    let written = write_report(&records, &path).unwrap();
    assert_eq!(written, 2);

    let rows = read_report(fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].source, "Application Error");
    assert_eq!(rows[0].event_id, 1000);
    assert_eq!(rows[0].message, "Faulting application app.exe");
    assert_eq!(rows[1].message, "Fault bucket, type 0");
    assert_eq!(rows[1].date_time, "2023-11-14T22:17:20Z");
}

#[test]
fn e2e_event_id_is_masked_and_keywords_match() {
    let source = MemorySource::new().with_batches("localhost", "System", application_log());
    let engine = QueryEngine::new(source);

    let criteria = FilterCriteria::match_all()
        .with_event_ids([4112])
        .with_keyword_list(" STARTED , ,");
    let records = engine.run("localhost", "System", criteria).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_id(), 4112);
    assert_eq!(records[0].severity(), Severity::Information);
    assert_eq!(records[0].message(), "Service started");
}

#[test]
fn e2e_no_match_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let engine = QueryEngine::new(
        MemorySource::new().with_batches("localhost", "Application", application_log()),
    );

    let criteria = FilterCriteria::match_all().with_keyword_list("no such text");
    let records = engine.run("localhost", "Application", criteria).unwrap();
    assert!(records.is_empty());

    let path = dir.path().join("event_report_localhost.csv");
    let result = write_report(&records, &path);
    assert!(matches!(result, Err(WriteError::EmptyResult)));
    assert!(!path.exists());
}

#[test]
fn e2e_unreachable_host_never_opens_a_handle() {
    let source = MemorySource::new().with_batches("localhost", "Application", application_log());
    let stats = source.stats();
    let engine = QueryEngine::new(source);

    let result = engine.run("offline-host", "Application", FilterCriteria::match_all());
    match result {
        Err(QueryError::Connection(e)) => {
            assert_eq!(e.host, "offline-host");
            assert!(matches!(e.kind, ConnectionFailure::HostUnreachable));
        }
        other => panic!("expected connection error, got {other:?}"),
    }
    assert_eq!(stats.closes(), 0);
}

#[test]
fn e2e_read_failure_mid_log_closes_once() {
    let source = MemorySource::new().with_script(
        "localhost",
        "Application",
        vec![
            Scripted::Batch(vec![raw(1, 1, 1000, "a", &["x"])]),
            Scripted::Fail(ReadError::with_code(1500, "The event log file is corrupted.")),
        ],
    );
    let stats = source.stats();
    let engine = QueryEngine::new(source);

    let result = engine.run("localhost", "Application", FilterCriteria::match_all());
    assert!(matches!(result, Err(QueryError::Read { .. })));
    assert_eq!(stats.closes(), 1);
}

#[test]
fn e2e_cancelled_query_releases_handle() {
    let source = MemorySource::new().with_batches("localhost", "Application", application_log());
    let stats = source.stats();
    let engine = QueryEngine::new(source);

    let token = CancelToken::new();
    token.cancel();
    let result = engine.run_with(
        "localhost",
        "Application",
        FilterCriteria::match_all(),
        QueryOptions::default().with_cancel(token),
    );

    assert!(matches!(result, Err(QueryError::Cancelled { .. })));
    assert_eq!(stats.closes(), 1);
}

#[test]
fn e2e_several_channels_each_get_a_report() {
    let dir = tempfile::tempdir().unwrap();
    let engine = QueryEngine::new(
        MemorySource::new()
            .with_batches("srv01", "Application", application_log())
            .with_batches("srv01", "System", vec![vec![raw(9, 2, 7036, "SCM", &["stopped"])]]),
    );
    let channels = vec!["Application".to_string(), "System".to_string()];

    let results = run_channels(
        &engine,
        "srv01",
        &channels,
        &FilterCriteria::match_all(),
        &QueryOptions::default(),
    );

    for result in results {
        let records = result.result.unwrap();
        let path = dir
            .path()
            .join(report_file_name("srv01", Some(&result.channel)));
        write_report(&records, &path).unwrap();
    }

    let application = dir.path().join("event_report_srv01_Application.csv");
    let system = dir.path().join("event_report_srv01_System.csv");
    assert_eq!(read_report(fs::File::open(application).unwrap()).unwrap().len(), 4);
    assert_eq!(read_report(fs::File::open(system).unwrap()).unwrap().len(), 1);
}

#[test]
fn e2e_unwritable_destination_is_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let engine = QueryEngine::new(
        MemorySource::new().with_batches("localhost", "Application", application_log()),
    );
    let records = engine
        .run("localhost", "Application", FilterCriteria::match_all())
        .unwrap();

    let path = dir.path().join("missing-folder").join("report.csv");
    let result = write_report(&records, &path);
    assert!(matches!(result, Err(WriteError::Io { .. })));
}
