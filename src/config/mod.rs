//! Configuration management.
//!
//! Configuration is resolved once at start-up and shared by reference.
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `STENCIL_CONFIG_PATH`, or the platform config dir)
//! 3. Environment overrides (`STENCIL_*`)

mod features;

pub use features::FeatureFlags;

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "STENCIL_CONFIG_PATH";

/// Main configuration for stencil.
#[derive(Debug, Clone)]
pub struct StencilConfig {
    /// Directory holding the database and logs.
    pub data_dir: PathBuf,
    /// Explicit database path; defaults to `{data_dir}/stencil.db`.
    pub database_path: Option<PathBuf>,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Aggregation and suggestion tunables.
    pub suggestions: SuggestionConfig,
    /// Route patterns the capture middleware classifies.
    pub capture: CaptureRoutes,
    /// Feature flags.
    pub features: FeatureFlags,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Largest request body the capture middleware will buffer.
    pub max_body_bytes: usize,
    /// Accept `x-user-id` as the session user when no JWT secret is set.
    ///
    /// Development only.
    pub trust_user_header: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            max_body_bytes: 64 * 1024,
            trust_user_header: false,
        }
    }
}

/// Aggregation and suggestion tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionConfig {
    /// Number of recent records the aggregator reads.
    pub history_window: usize,
    /// Number of recent template views/implements excluded from suggestions.
    pub exclusion_window: usize,
    /// Categories kept in a snapshot.
    pub top_categories: usize,
    /// Tags kept in a snapshot.
    pub top_tags: usize,
    /// Suggestions returned when the caller gives no limit.
    pub default_limit: usize,
    /// Upper bound on a caller-supplied limit.
    pub max_limit: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            history_window: 50,
            exclusion_window: 20,
            top_categories: 5,
            top_tags: 10,
            default_limit: crate::models::DEFAULT_LIMIT,
            max_limit: 50,
        }
    }
}

/// Regex route patterns for behavior capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRoutes {
    /// `GET` on this path records a template view.
    pub templates_list: String,
    /// `POST` on this path records an implementation.
    pub implement: String,
    /// `GET` on this path records a search.
    pub search: String,
    /// `POST` on this path records a favorite.
    pub favorite: String,
}

impl Default for CaptureRoutes {
    fn default() -> Self {
        Self {
            templates_list: r"^/api/templates/?$".to_string(),
            implement: r"^/api/templates/implement/?$".to_string(),
            search: r"^/api/search/?$".to_string(),
            favorite: r"^/api/templates/favorite/?$".to_string(),
        }
    }
}

/// Logging settings as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Optional log file path.
    pub file: Option<String>,
    /// Filter directive, e.g. `stencil=debug`.
    pub filter: Option<String>,
}

/// Metrics settings as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is installed.
    pub enabled: Option<bool>,
    /// Exporter port.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database path.
    pub database_path: Option<String>,
    /// Server section.
    pub server: Option<ConfigFileServer>,
    /// Suggestions section.
    pub suggestions: Option<ConfigFileSuggestions>,
    /// Capture section.
    pub capture: Option<ConfigFileCapture>,
    /// Feature flags.
    pub features: Option<ConfigFileFeatures>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

/// Server section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileServer {
    /// Bind address.
    pub bind: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// Body buffer bound.
    pub max_body_bytes: Option<usize>,
    /// Development user header.
    pub trust_user_header: Option<bool>,
}

/// Suggestions section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileSuggestions {
    /// History window.
    pub history_window: Option<usize>,
    /// Exclusion window.
    pub exclusion_window: Option<usize>,
    /// Top categories.
    pub top_categories: Option<usize>,
    /// Top tags.
    pub top_tags: Option<usize>,
    /// Default limit.
    pub default_limit: Option<usize>,
    /// Maximum limit.
    pub max_limit: Option<usize>,
}

/// Capture section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileCapture {
    /// Templates listing pattern.
    pub templates_list: Option<String>,
    /// Implement pattern.
    pub implement: Option<String>,
    /// Search pattern.
    pub search: Option<String>,
    /// Favorite pattern.
    pub favorite: Option<String>,
}

/// Features section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFeatures {
    /// Behavior capture.
    pub behavior_capture: Option<bool>,
    /// Lazy preference computation.
    pub lazy_preferences: Option<bool>,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: None,
            server: ServerConfig::default(),
            suggestions: SuggestionConfig::default(),
            capture: CaptureRoutes::default(),
            features: FeatureFlags::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl StencilConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`].
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Returns default configuration if no config file is found or the
    /// file found cannot be parsed.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(dirs) = directories::ProjectDirs::from("", "", "stencil") else {
            return Self::default();
        };

        let path = dirs.config_dir().join("config.toml");
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                },
            }
        }

        Self::default()
    }

    /// Resolves configuration from an explicit path, the environment, or
    /// the default location, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            Self::load_from_file(path)?
        } else if let Some(path) = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
        {
            Self::load_from_file(Path::new(&path))?
        } else {
            Self::load_default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies `STENCIL_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("STENCIL_DATABASE_PATH")
            && !path.trim().is_empty()
        {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(port) = std::env::var("STENCIL_PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Some(enabled) = std::env::var("STENCIL_METRICS_ENABLED")
            .ok()
            .and_then(|v| parse_bool(&v))
        {
            self.metrics.enabled = Some(enabled);
        }
        if let Some(port) = std::env::var("STENCIL_METRICS_PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
        {
            self.metrics.port = Some(port);
        }
        if let Ok(format) = std::env::var("STENCIL_LOG_FORMAT")
            && !format.trim().is_empty()
        {
            self.logging.format = Some(format);
        }
    }

    /// Returns the resolved database path.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("stencil.db"))
    }

    /// Converts a `ConfigFile` to `StencilConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        config.database_path = file.database_path.map(PathBuf::from);

        if let Some(server) = file.server {
            if let Some(v) = server.bind {
                config.server.bind = v;
            }
            if let Some(v) = server.port {
                config.server.port = v;
            }
            if let Some(v) = server.max_body_bytes {
                config.server.max_body_bytes = v;
            }
            if let Some(v) = server.trust_user_header {
                config.server.trust_user_header = v;
            }
        }
        if let Some(s) = file.suggestions {
            let target = &mut config.suggestions;
            for (value, slot) in [
                (s.history_window, &mut target.history_window),
                (s.exclusion_window, &mut target.exclusion_window),
                (s.top_categories, &mut target.top_categories),
                (s.top_tags, &mut target.top_tags),
                (s.default_limit, &mut target.default_limit),
                (s.max_limit, &mut target.max_limit),
            ] {
                if let Some(v) = value {
                    *slot = v;
                }
            }
        }
        if let Some(capture) = file.capture {
            if let Some(v) = capture.templates_list {
                config.capture.templates_list = v;
            }
            if let Some(v) = capture.implement {
                config.capture.implement = v;
            }
            if let Some(v) = capture.search {
                config.capture.search = v;
            }
            if let Some(v) = capture.favorite {
                config.capture.favorite = v;
            }
        }
        if let Some(features) = file.features {
            if let Some(v) = features.behavior_capture {
                config.features.behavior_capture = v;
            }
            if let Some(v) = features.lazy_preferences {
                config.features.lazy_preferences = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        config
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }
}

/// Returns the platform data directory, or `.stencil` when none exists.
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "stencil")
        .map_or_else(|| PathBuf::from(".stencil"), |d| d.data_dir().to_path_buf())
}

/// Parses common boolean spellings.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
