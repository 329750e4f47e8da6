// EventReport - platform/config.rs
//
// Platform directory resolution and config.toml loading with startup
// validation. Uses the `directories` crate for XDG (Linux), AppData
// (Windows), Library (macOS) compliance, and for the user's Documents
// folder (default report destination).

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::{ProjectDirs, UserDirs};
use std::path::{Path, PathBuf};

/// Resolved platform paths.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/eventreport/ or %APPDATA%\EventReport\config\)
    pub config_dir: PathBuf,

    /// Default folder for exported reports.
    pub documents_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        let config_dir = match ProjectDirs::from("", "", constants::APP_ID) {
            Some(dirs) => dirs.config_dir().to_path_buf(),
            None => {
                tracing::warn!("Could not determine platform config directory, using current directory");
                PathBuf::from(".")
            }
        };

        let documents_dir = UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        tracing::debug!(
            config = %config_dir.display(),
            documents = %documents_dir.display(),
            "Platform paths resolved"
        );

        Self {
            config_dir,
            documents_dir,
        }
    }

    /// Full path of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[query]` section.
    pub query: QuerySection,
    /// `[export]` section.
    pub export: ExportSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[query]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct QuerySection {
    /// Host queried when the CLI gives none.
    pub host: Option<String>,
    /// Channel queried when the CLI gives none.
    pub channel: Option<String>,
    /// Native read buffer size in bytes.
    pub read_buffer_bytes: Option<usize>,
}

/// `[export]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// Folder reports are written to.
    pub output_dir: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub channel: String,
    pub read_buffer_bytes: usize,
    /// `None` = the user's Documents folder.
    pub output_dir: Option<PathBuf>,
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_HOST.to_string(),
            channel: constants::DEFAULT_CHANNEL.to_string(),
            read_buffer_bytes: constants::DEFAULT_READ_BUFFER_BYTES,
            output_dir: None,
            log_level: None,
        }
    }
}

/// Validate a parsed config, collecting every problem. Each invalid value
/// falls back to its default.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<ConfigError>) {
    let mut config = AppConfig::default();
    let mut problems = Vec::new();

    // -- Query: host --
    if let Some(host) = raw.query.host {
        let host = host.trim();
        if !host.is_empty() {
            config.host = host.to_string();
        }
    }

    // -- Query: channel --
    if let Some(channel) = raw.query.channel {
        let channel = channel.trim();
        if channel.is_empty() {
            problems.push(ConfigError::ValueOutOfRange {
                field: "[query] channel".to_string(),
                value: String::new(),
                expected: format!(
                    "a channel name such as {}",
                    constants::WELL_KNOWN_CHANNELS.join(", ")
                ),
            });
        } else {
            config.channel = channel.to_string();
        }
    }

    // -- Query: read_buffer_bytes --
    if let Some(bytes) = raw.query.read_buffer_bytes {
        if (constants::MIN_READ_BUFFER_BYTES..=constants::MAX_READ_BUFFER_BYTES).contains(&bytes) {
            config.read_buffer_bytes = bytes;
        } else {
            problems.push(ConfigError::ValueOutOfRange {
                field: "[query] read_buffer_bytes".to_string(),
                value: bytes.to_string(),
                expected: format!(
                    "{}-{} (default {})",
                    constants::MIN_READ_BUFFER_BYTES,
                    constants::MAX_READ_BUFFER_BYTES,
                    constants::DEFAULT_READ_BUFFER_BYTES
                ),
            });
        }
    }

    // -- Export: output_dir --
    if let Some(dir) = raw.export.output_dir {
        if !dir.trim().is_empty() {
            config.output_dir = Some(PathBuf::from(dir.trim()));
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            problems.push(ConfigError::ValueOutOfRange {
                field: "[logging] level".to_string(),
                value: level,
                expected: "error, warn, info, debug, trace (default info)".to_string(),
            });
        }
    }

    (config, problems)
}

/// Parse and validate config text. `path` is only used for error context.
pub fn parse_config(content: &str, path: &Path) -> (AppConfig, Vec<ConfigError>) {
    match toml::from_str::<RawConfig>(content) {
        Ok(raw) => validate(raw),
        Err(e) => (
            AppConfig::default(),
            vec![ConfigError::TomlParse {
                path: path.to_path_buf(),
                source: e,
            }],
        ),
    }
}

/// Load and validate config.toml at `config_path`.
///
/// A missing file yields defaults with no problems (first run). An
/// unreadable or unparseable file yields defaults plus the error; the
/// tool still runs.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<ConfigError>) {
    if !config_path.exists() {
        return (AppConfig::default(), Vec::new());
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            return (
                AppConfig::default(),
                vec![ConfigError::Io {
                    path: config_path.to_path_buf(),
                    source: e,
                }],
            )
        }
    };

    parse_config(&content, config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (AppConfig, Vec<ConfigError>) {
        parse_config(text, Path::new("config.toml"))
    }

    #[test]
    fn test_defaults_when_empty() {
        let (config, problems) = parse("");
        assert!(problems.is_empty());
        assert_eq!(config.host, "localhost");
        assert_eq!(config.channel, "Application");
        assert_eq!(config.read_buffer_bytes, constants::DEFAULT_READ_BUFFER_BYTES);
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_valid_values_applied() {
        let (config, problems) = parse(
            r#"
            [query]
            host = "srv01"
            channel = "System"
            read_buffer_bytes = 8192

            [export]
            output_dir = "/tmp/reports"

            [logging]
            level = "DEBUG"

            [unknown]
            ignored = true
            "#,
        );
        assert!(problems.is_empty(), "{problems:?}");
        assert_eq!(config.host, "srv01");
        assert_eq!(config.channel, "System");
        assert_eq!(config.read_buffer_bytes, 8192);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/reports")));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_falls_back_with_problem() {
        let (config, problems) = parse(
            r#"
            [query]
            read_buffer_bytes = 16
            [logging]
            level = "loud"
            "#,
        );
        assert_eq!(problems.len(), 2);
        assert_eq!(config.read_buffer_bytes, constants::DEFAULT_READ_BUFFER_BYTES);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_blank_host_keeps_default() {
        let (config, problems) = parse("[query]\nhost = \"  \"\n");
        assert!(problems.is_empty());
        assert_eq!(config.host, "localhost");
    }

    #[test]
    fn test_syntax_error_reported() {
        let (config, problems) = parse("[query\nhost=");
        assert!(matches!(problems.as_slice(), [ConfigError::TomlParse { .. }]));
        assert_eq!(config.host, "localhost");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (config, problems) = load_config(&dir.path().join("config.toml"));
        assert!(problems.is_empty());
        assert_eq!(config.channel, "Application");
    }
}
