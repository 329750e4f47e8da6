// EventReport - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "EventReport";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "EventReport";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Query defaults
// =============================================================================

/// Host queried when none is given (or the given one is blank).
pub const DEFAULT_HOST: &str = "localhost";

/// Channel queried when none is given.
pub const DEFAULT_CHANNEL: &str = "Application";

/// Channels offered as suggestions. Any channel name the platform exposes is
/// accepted; this list is not a whitelist.
pub const WELL_KNOWN_CHANNELS: &[&str] = &["Application", "System", "Security"];

// =============================================================================
// Native read limits
// =============================================================================

/// Default size of the buffer handed to the native sequential read call.
/// One buffer-full is one batch.
pub const DEFAULT_READ_BUFFER_BYTES: usize = 64 * 1024; // 64 KB

/// Smallest configurable read buffer.
pub const MIN_READ_BUFFER_BYTES: usize = 4 * 1024; // 4 KB

/// Largest configurable read buffer. The native API rejects reads above
/// 0x7FFFF bytes.
pub const MAX_READ_BUFFER_BYTES: usize = 512 * 1024; // 512 KB

// =============================================================================
// Normalisation
// =============================================================================

/// Mask applied to the raw platform event code. The low 16 bits are the
/// conventional event ID; the high bits carry facility/severity flags.
pub const EVENT_ID_MASK: u32 = 0xFFFF;

/// Message text used when a record carries no (non-empty) string inserts.
pub const NO_MESSAGE_SENTINEL: &str = "No message";

/// Separator placed between string inserts when flattening the message.
pub const MESSAGE_INSERT_SEPARATOR: &str = " ";

/// Maximum number of skipped-record warnings logged individually per query.
/// Further skips are only counted.
pub const MAX_SKIP_WARNINGS_PER_QUERY: usize = 100;

// =============================================================================
// Report
// =============================================================================

/// Report header, in column order.
pub const REPORT_HEADER: [&str; 5] = ["DateTime", "Source", "EventID", "Category", "Message"];

/// Report file name prefix; the host (and channel, for multi-channel runs)
/// is appended.
pub const REPORT_FILE_PREFIX: &str = "event_report_";

/// Report file extension.
pub const REPORT_FILE_EXTENSION: &str = "csv";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
