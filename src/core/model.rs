// EventReport - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies. These types are the shared vocabulary across
// all layers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Raw record (what a log source hands out)
// =============================================================================

/// One record as delivered by a `LogSource`, before normalisation.
///
/// Field shapes follow the native event-log record layout: the generated
/// time is seconds since the Unix epoch, the event code still carries its
/// facility/severity bits, and the message is a list of string inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Position of the record in the log (monotonic per log).
    pub record_number: u32,

    /// Seconds since 1970-01-01T00:00:00Z at which the event was generated.
    pub time_generated: i64,

    /// Full platform event code (high 16 bits are flags).
    pub event_code: u32,

    /// Native severity code.
    pub event_type: u16,

    /// Source-defined category.
    pub category: u16,

    /// Name of the application or subsystem that raised the event.
    pub source: String,

    /// String inserts, in order.
    pub inserts: Vec<String>,
}

// =============================================================================
// Event record (normalised)
// =============================================================================

/// A single event, normalised into the stable report schema.
///
/// Instances are only produced by `core::normalize::normalize`, which
/// guarantees that `event_id` is the masked code and that `message` is
/// never empty. There are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    timestamp: DateTime<Utc>,
    source: String,
    event_id: u16,
    category: u16,
    message: String,
    severity: Severity,
}

impl EventRecord {
    pub(crate) fn new(
        timestamp: DateTime<Utc>,
        source: String,
        event_id: u16,
        category: u16,
        message: String,
        severity: Severity,
    ) -> Self {
        Self {
            timestamp,
            source,
            event_id,
            category,
            message,
            severity,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Locale-independent, lexically sortable rendering of the timestamp
    /// (RFC 3339, UTC, whole seconds).
    pub fn timestamp_text(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn event_id(&self) -> u16 {
        self.event_id
    }

    pub fn category(&self) -> u16 {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Canonical severity levels.
///
/// Native codes are mapped by `Severity::from_native`. Codes with no
/// mapping become `Unknown`, which is a real, filterable level: it is
/// neither a wildcard nor silently excluded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Information,
    SuccessAudit,
    FailureAudit,
    #[default]
    Unknown,
}

impl Severity {
    /// Returns all variants in display order (most severe first).
    pub fn all() -> &'static [Severity] {
        &[
            Severity::Critical,
            Severity::Error,
            Severity::Warning,
            Severity::Information,
            Severity::SuccessAudit,
            Severity::FailureAudit,
            Severity::Unknown,
        ]
    }

    /// Map a native event-type code (legacy Windows event log) to a level.
    ///
    /// 0 (EVENTLOG_SUCCESS) is how many sources log plain informational
    /// events, so it maps to `Information`. The legacy API has no critical
    /// level.
    pub fn from_native(code: u16) -> Severity {
        match code {
            0x0000 | 0x0004 => Severity::Information,
            0x0001 => Severity::Error,
            0x0002 => Severity::Warning,
            0x0008 => Severity::SuccessAudit,
            0x0010 => Severity::FailureAudit,
            _ => Severity::Unknown,
        }
    }

    /// Parse a user-supplied level name (case-insensitive, common aliases).
    pub fn from_name(name: &str) -> Option<Severity> {
        match name.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "critical" | "crit" => Some(Severity::Critical),
            "error" | "err" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            "information" | "info" => Some(Severity::Information),
            "success-audit" | "audit-success" => Some(Severity::SuccessAudit),
            "failure-audit" | "audit-failure" => Some(Severity::FailureAudit),
            "unknown" => Some(Severity::Unknown),
            _ => None,
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Information => "Information",
            Severity::SuccessAudit => "Success Audit",
            Severity::FailureAudit => "Failure Audit",
            Severity::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
