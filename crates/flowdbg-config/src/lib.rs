//! Configuration for the flowdbg breakpoint coordinator.
//!
//! Configuration is read from TOML. Every section is optional; missing keys fall back to
//! defaults so an empty file is a valid configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod logging;
mod schema;

pub use logging::{global_log_buffer, init_tracing, LogBuffer, TracingSetup};
pub use schema::json_schema;

/// Suspend timeout applied when the configuration does not override it.
pub const DEFAULT_SUSPEND_TIMEOUT_MS: u64 = 5_000;

/// Environment variable naming the config file used by [`FlowdbgConfig::load_from_env`].
pub const FLOWDBG_CONFIG_ENV_VAR: &str = "FLOWDBG_CONFIG";

/// Top-level flowdbg configuration.
///
/// ```toml
/// [logging]
/// level = "debug"
/// json = false
///
/// [debug]
/// suspend_timeout_ms = 5000
/// max_sessions_per_tenant = 4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(deny_unknown_fields)]
pub struct FlowdbgConfig {
    /// Logging settings shared by every flowdbg crate.
    pub logging: LoggingConfig,

    /// Breakpoint session behaviour.
    pub debug: DebugConfig,
}

#[allow(clippy::derivable_impls)]
impl Default for FlowdbgConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct DebugConfig {
    /// Upper bound on how long a worker thread stays parked at a breakpoint without a
    /// resume command from the client.
    ///
    /// A value of `0` is treated as the default.
    #[serde(default = "DebugConfig::default_suspend_timeout_ms")]
    pub suspend_timeout_ms: u64,

    /// Maximum number of concurrently open debug sessions for one tenant.
    ///
    /// `None` means unlimited.
    #[serde(default)]
    pub max_sessions_per_tenant: Option<usize>,
}

impl DebugConfig {
    fn default_suspend_timeout_ms() -> u64 {
        DEFAULT_SUSPEND_TIMEOUT_MS
    }

    pub fn suspend_timeout(&self) -> Duration {
        match self.suspend_timeout_ms {
            0 => Duration::from_millis(DEFAULT_SUSPEND_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }

    pub fn with_suspend_timeout(mut self, timeout: Duration) -> Self {
        self.suspend_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            suspend_timeout_ms: Self::default_suspend_timeout_ms(),
            max_sessions_per_tenant: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level for all flowdbg crates.
    ///
    /// Either a simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Mirror logs to stderr (in addition to the in-memory buffer).
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to the given file path (in addition to the in-memory buffer).
    ///
    /// If the file cannot be opened, file logging is disabled while other sinks
    /// remain active.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub file: Option<PathBuf>,

    /// Number of log lines kept in memory for diagnostics.
    #[serde(default = "LoggingConfig::default_buffer_lines")]
    #[schemars(range(min = 1))]
    pub buffer_lines: usize,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn default_buffer_lines() -> usize {
        2_000
    }

    /// Map `level` to `EnvFilter` directives.
    ///
    /// Simple level names are accepted in any case (plus `warning`); anything else is passed
    /// through as a directive string.
    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let level = input.trim();
        if level.is_empty() {
            return Self::default_level();
        }
        if level.eq_ignore_ascii_case("warning") {
            return "warn".to_owned();
        }
        match level.parse::<LevelFilter>() {
            Ok(filter) => filter.to_string(),
            Err(_) => level.to_owned(),
        }
    }

    pub(crate) fn config_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(Self::normalize_level_directives(&self.level))
            .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::INFO.into()))
    }

    /// The effective filter: the configured level with `RUST_LOG` layered on top.
    ///
    /// An unparsable combination falls back to `RUST_LOG` alone, then to the configured level.
    pub fn env_filter(&self) -> EnvFilter {
        let Some(from_env) = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
        else {
            return self.config_env_filter();
        };

        let configured = Self::normalize_level_directives(&self.level);
        EnvFilter::try_new(format!("{configured},{from_env}"))
            .or_else(|_| EnvFilter::try_new(&from_env))
            .unwrap_or_else(|_| self.config_env_filter())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
            buffer_lines: Self::default_buffer_lines(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The `Display` impl embeds a snippet of the source text; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl FlowdbgConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load the file named by `FLOWDBG_CONFIG`, falling back to defaults.
    ///
    /// A missing variable is not an error. An unreadable or invalid file is logged and
    /// replaced by the defaults so the host application keeps running.
    pub fn load_from_env() -> Self {
        let Some(path) = std::env::var_os(FLOWDBG_CONFIG_ENV_VAR).map(PathBuf::from) else {
            return Self::default();
        };

        match Self::load_from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    target: "flowdbg.config",
                    path = %path.display(),
                    error = %err,
                    "failed to load config; continuing with defaults"
                );
                Self::default()
            }
        }
    }
}
