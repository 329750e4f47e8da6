// EventReport - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation
// 3. Running the query (one channel, or several in parallel)
// 4. Preview on stdout and CSV report export
//
// Exit codes: 0 success (including "no matching events"), 1 a query
// failed, 2 a report could not be written.

use clap::{CommandFactory, Parser, ValueEnum};
use eventreport::app::batch::{run_channels, ChannelResult};
use eventreport::app::query::{QueryEngine, QueryOptions};
use eventreport::core::export::{export_json, report_file_name, write_report};
use eventreport::core::filter::FilterCriteria;
use eventreport::core::model::{EventRecord, Severity};
use eventreport::platform::config::{load_config, PlatformPaths};
use eventreport::platform::eventlog::NativeEventLog;
use eventreport::util;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

/// How matching records are shown on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preview {
    Text,
    Json,
    None,
}

/// EventReport - filter a Windows event log and export the matches to CSV.
#[derive(Parser, Debug)]
#[command(name = "eventreport", version, about)]
struct Cli {
    /// Machine to query (default from config.toml, else localhost).
    #[arg(short = 'H', long = "host")]
    host: Option<String>,

    /// Log channel(s), repeatable or comma-separated. Several channels are
    /// queried in parallel.
    #[arg(short = 'c', long = "channel", value_delimiter = ',')]
    channels: Vec<String>,

    /// Severities to keep (critical, error, warning, information,
    /// success-audit, failure-audit, unknown). Empty keeps all.
    #[arg(short = 'l', long = "level", value_delimiter = ',', value_parser = parse_severity)]
    levels: Vec<Severity>,

    /// Event IDs to keep, comma-separated. Empty keeps all.
    #[arg(short = 'i', long = "event-id", value_delimiter = ',')]
    event_ids: Vec<u16>,

    /// Comma-separated keywords; a record matches when its message contains
    /// any of them (case-insensitive).
    #[arg(short = 'k', long = "keywords")]
    keywords: Option<String>,

    /// Explicit report path (single channel only).
    #[arg(short = 'o', long = "output", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Folder for the report (default from config.toml, else Documents).
    #[arg(long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Skip the CSV export.
    #[arg(long = "no-export")]
    no_export: bool,

    /// Preview format for matching records on stdout.
    #[arg(long = "preview", value_enum, default_value_t = Preview::Text)]
    preview: Preview,

    /// Abandon the query after this many seconds.
    #[arg(long = "deadline-secs")]
    deadline_secs: Option<u64>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn parse_severity(name: &str) -> Result<Severity, String> {
    Severity::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = Severity::all().iter().map(Severity::label).collect();
        format!("unknown severity '{name}' (expected one of: {})", known.join(", "))
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config first: it may carry the log level.
    let platform_paths = PlatformPaths::resolve();
    let (config, config_problems) = load_config(&platform_paths.config_file());

    util::logging::init(cli.debug, config.log_level.as_deref());

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "EventReport starting"
    );

    for problem in &config_problems {
        tracing::warn!(error = %problem, "Config problem, using default");
    }

    let host = cli
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(config.host.as_str())
        .to_string();

    let mut channels: Vec<String> = cli
        .channels
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if channels.is_empty() {
        channels.push(config.channel.clone());
    }

    if cli.output.is_some() && channels.len() > 1 {
        Cli::command()
            .error(
                clap::error::ErrorKind::ArgumentConflict,
                "--output names a single file; use --output-dir with several channels",
            )
            .exit();
    }

    let criteria = FilterCriteria::match_all()
        .with_severities(cli.levels.iter().copied())
        .with_event_ids(cli.event_ids.iter().copied())
        .with_keyword_list(cli.keywords.as_deref().unwrap_or(""));

    let mut options = QueryOptions::default();
    if let Some(secs) = cli.deadline_secs {
        options = options.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    let engine = QueryEngine::new(NativeEventLog::new(config.read_buffer_bytes));

    let results = if channels.len() == 1 {
        let channel = channels.remove(0);
        let result = engine.run_with(&host, &channel, criteria, options);
        vec![ChannelResult { channel, result }]
    } else {
        run_channels(&engine, &host, &channels, &criteria, &options)
    };

    let several = results.len() > 1;
    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| platform_paths.documents_dir.clone());

    let mut query_failed = false;
    let mut export_failed = false;

    for ChannelResult { channel, result } in results {
        let records = match result {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(host = %host, channel = %channel, error = %e, "Query failed");
                eprintln!("Could not read log: {e}");
                query_failed = true;
                continue;
            }
        };

        if records.is_empty() {
            println!("No matching events in '{channel}' on '{host}'");
            continue;
        }

        if let Err(e) = print_preview(cli.preview, &channel, &records) {
            tracing::warn!(error = %e, "Could not write preview to stdout");
        }

        if cli.no_export {
            continue;
        }

        let path = match &cli.output {
            Some(path) => path.clone(),
            None => output_dir.join(report_file_name(
                &host,
                several.then_some(channel.as_str()),
            )),
        };

        match write_report(&records, &path) {
            Ok(count) => println!("Report written to {} ({count} events)", path.display()),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Export failed");
                eprintln!("Could not write report: {e}");
                export_failed = true;
            }
        }
    }

    if query_failed {
        ExitCode::from(1)
    } else if export_failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_preview(preview: Preview, channel: &str, records: &[EventRecord]) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match preview {
        Preview::None => {}
        Preview::Text => {
            writeln!(out, "{channel}: {} matching events", records.len())?;
            for record in records {
                writeln!(
                    out,
                    "{}  {:<13} {:>5}  {}  {}",
                    record.timestamp_text(),
                    record.severity().label(),
                    record.event_id(),
                    record.source(),
                    record.message().replace(['\r', '\n'], " ")
                )?;
            }
        }
        Preview::Json => {
            export_json(records, &mut out)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            writeln!(out)?;
        }
    }

    out.flush()
}
