// EventReport - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Each subsystem owns one enum; all of them fold into `EventReportError`.
// Raw platform error codes are carried as data but never used as the
// primary user-facing message.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all EventReport operations.
#[derive(Debug)]
pub enum EventReportError {
    /// The event log could not be opened.
    Connection(ConnectionError),

    /// A query failed after the log was opened.
    Query(QueryError),

    /// A single record could not be normalised.
    Normalization(NormalizationError),

    /// Report export failed.
    Write(WriteError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for EventReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "Connection error: {e}"),
            Self::Query(e) => write!(f, "Query error: {e}"),
            Self::Normalization(e) => write!(f, "Normalization error: {e}"),
            Self::Write(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for EventReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::Query(e) => Some(e),
            Self::Normalization(e) => Some(e),
            Self::Write(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection errors
// ---------------------------------------------------------------------------

/// Why a log could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// The host name did not resolve or the host did not answer.
    HostUnreachable,

    /// The host answered but has no channel by that name.
    ChannelNotFound,

    /// The caller lacks read permission on the channel.
    AccessDenied,

    /// No native event-log backend exists on this platform.
    Unsupported,

    /// Any other platform failure; `code` is the raw platform error code.
    Other { code: u32, message: String },
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostUnreachable => f.write_str("host is unreachable"),
            Self::ChannelNotFound => f.write_str("no such event log channel"),
            Self::AccessDenied => f.write_str("access denied (missing read permission)"),
            Self::Unsupported => {
                f.write_str("native event log access is only supported on Windows")
            }
            Self::Other { message, .. } if !message.trim().is_empty() => {
                f.write_str(message.trim())
            }
            Self::Other { code, .. } => write!(f, "platform error (code {code})"),
        }
    }
}

/// Opening a named channel on a named host failed.
#[derive(Debug, Clone)]
pub struct ConnectionError {
    pub host: String,
    pub channel: String,
    pub kind: ConnectionFailure,
}

impl ConnectionError {
    pub fn new(host: &str, channel: &str, kind: ConnectionFailure) -> Self {
        Self {
            host: host.to_string(),
            channel: channel.to_string(),
            kind,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not open the '{}' log on '{}': {}",
            self.channel, self.host, self.kind
        )
    }
}

impl std::error::Error for ConnectionError {}

impl From<ConnectionError> for EventReportError {
    fn from(e: ConnectionError) -> Self {
        Self::Connection(e)
    }
}

// ---------------------------------------------------------------------------
// Read errors (raised by an open log handle)
// ---------------------------------------------------------------------------

/// A batch read on an open handle failed.
#[derive(Debug, Clone)]
pub struct ReadError {
    /// Raw platform error code, if the backend has one.
    pub code: Option<u32>,
    /// Human-readable description.
    pub message: String,
}

impl ReadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.trim().is_empty() {
            match self.code {
                Some(code) => write!(f, "read failed (code {code})"),
                None => f.write_str("read failed"),
            }
        } else {
            f.write_str(self.message.trim())
        }
    }
}

impl std::error::Error for ReadError {}

// ---------------------------------------------------------------------------
// Normalization errors
// ---------------------------------------------------------------------------

/// A single raw record could not be converted into an `EventRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// The generated-time field is outside the representable range.
    InvalidTimestamp { record_number: u32, raw: i64 },
}

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimestamp { record_number, raw } => write!(
                f,
                "record {record_number}: timestamp {raw} is not a valid point in time"
            ),
        }
    }
}

impl std::error::Error for NormalizationError {}

impl From<NormalizationError> for EventReportError {
    fn from(e: NormalizationError) -> Self {
        Self::Normalization(e)
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Errors that abort a whole query.
#[derive(Debug)]
pub enum QueryError {
    /// The log could not be opened; nothing was read.
    Connection(ConnectionError),

    /// A batch read failed after a successful open.
    Read {
        host: String,
        channel: String,
        source: ReadError,
    },

    /// The caller's cancel token was set between two batch reads.
    Cancelled {
        host: String,
        channel: String,
        delivered: usize,
    },

    /// The caller's deadline passed between two batch reads.
    DeadlineExceeded {
        host: String,
        channel: String,
        delivered: usize,
    },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "{e}"),
            Self::Read {
                host,
                channel,
                source,
            } => write!(f, "reading the '{channel}' log on '{host}' failed: {source}"),
            Self::Cancelled {
                host,
                channel,
                delivered,
            } => write!(
                f,
                "query of the '{channel}' log on '{host}' was cancelled \
                 after {delivered} matching events"
            ),
            Self::DeadlineExceeded {
                host,
                channel,
                delivered,
            } => write!(
                f,
                "query of the '{channel}' log on '{host}' passed its deadline \
                 after {delivered} matching events"
            ),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConnectionError> for QueryError {
    fn from(e: ConnectionError) -> Self {
        Self::Connection(e)
    }
}

impl From<QueryError> for EventReportError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

// ---------------------------------------------------------------------------
// Write errors
// ---------------------------------------------------------------------------

/// Errors related to report export.
#[derive(Debug)]
pub enum WriteError {
    /// There are no records to export. A header-only report is never written.
    EmptyResult,

    /// I/O error creating or writing the report file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error (record preview).
    Json { source: serde_json::Error },
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResult => f.write_str("no events to export; report not written"),
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { source } => write!(f, "JSON serialisation error: {source}"),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source } => Some(source),
            Self::EmptyResult => None,
        }
    }
}

impl From<WriteError> for EventReportError {
    fn from(e: WriteError) -> Self {
        Self::Write(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for EventReportError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for EventReport results.
pub type Result<T> = std::result::Result<T, EventReportError>;
