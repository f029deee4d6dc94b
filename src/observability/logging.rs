//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive.
pub const LOG_FILTER_ENV: &str = "STENCIL_LOG";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format name; unknown names fall back to `Pretty`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Line format.
    pub format: LogFormat,
    /// Optional file to append to instead of stderr.
    pub file: Option<PathBuf>,
    /// Level filter.
    pub filter: EnvFilter,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings.
    ///
    /// Filter precedence: `STENCIL_LOG`, then `RUST_LOG`, then the config
    /// file, then `debug`/`info` depending on `verbose`.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let format = settings
            .format
            .as_deref()
            .map(LogFormat::parse)
            .unwrap_or_default();
        let file = settings
            .file
            .as_ref()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(PathBuf::from);
        let directive = filter_directive(settings.filter.as_deref(), verbose);

        Self {
            format,
            file,
            filter: EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info")),
        }
    }
}

fn filter_directive(configured: Option<&str>, verbose: bool) -> String {
    [LOG_FILTER_ENV, "RUST_LOG"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| configured.map(str::to_string).filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Pretty);
    }

    #[test]
    fn test_from_settings_reads_format_and_file() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            file: Some("  ".to_string()),
            filter: None,
        };
        let config = LoggingConfig::from_settings(&settings, false);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.file.is_none());
    }
}
