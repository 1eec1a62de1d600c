//! Configuration management.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`load_from_file` / `load_default`)
//! 3. `RECORDKIT_*` environment variables (`apply_env_overrides`)

use crate::observability::{LogFormat, LoggingConfig};
use crate::storage::BatchMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for recordkit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordkitConfig {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database file; `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Bound on the liveness probe, in milliseconds.
    pub ping_timeout_ms: u64,
    /// `SQLite` `busy_timeout`, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Name of the identifier column shared by all tables.
    pub id_column: String,
    /// Failure policy of batch inserts and deletes.
    pub batch_mode: BatchMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            ping_timeout_ms: 5_000,
            busy_timeout_ms: 5_000,
            id_column: "id".to_string(),
            batch_mode: BatchMode::Atomic,
        }
    }
}

impl DatabaseConfig {
    /// Liveness probe timeout.
    #[must_use]
    pub const fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Lock wait timeout.
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Database section.
    pub database: Option<ConfigFileDatabase>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// `[database]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDatabase {
    /// Database file path.
    pub path: Option<String>,
    /// Ping timeout in milliseconds.
    pub ping_timeout_ms: Option<u64>,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u64>,
    /// Identifier column.
    pub id_column: Option<String>,
    /// `atomic` or `best-effort`.
    pub batch_mode: Option<String>,
}

/// `[logging]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty`, `compact` or `json`.
    pub format: Option<String>,
    /// Filter directives.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl RecordkitConfig {
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
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::parse_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`].
    pub fn parse_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/recordkit/` on macOS)
    /// 2. XDG config dir (`~/.config/recordkit/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("recordkit").join("config.toml");
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("recordkit")
            .join("config.toml");

        for candidate in [platform_config, xdg_config] {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "ignoring unreadable config file"
                    );
                },
            }
        }

        Self::default()
    }

    /// Applies `RECORDKIT_*` environment overrides.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `RECORDKIT_DB_PATH` (or `DB_PATH`) | `database.path` |
    /// | `RECORDKIT_PING_TIMEOUT_MS` | `database.ping_timeout_ms` |
    /// | `RECORDKIT_BUSY_TIMEOUT_MS` | `database.busy_timeout_ms` |
    /// | `RECORDKIT_ID_COLUMN` | `database.id_column` |
    /// | `RECORDKIT_BATCH_MODE` | `database.batch_mode` |
    /// | `RECORDKIT_LOG_FORMAT` | `logging.format` |
    /// | `RECORDKIT_LOG_FILTER` | `logging.filter` |
    #[must_use]
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and skipped.
    #[must_use]
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty("RECORDKIT_DB_PATH").or_else(|| non_empty("DB_PATH")) {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(ms) = parse_millis("RECORDKIT_PING_TIMEOUT_MS", &non_empty) {
            self.database.ping_timeout_ms = ms;
        }
        if let Some(ms) = parse_millis("RECORDKIT_BUSY_TIMEOUT_MS", &non_empty) {
            self.database.busy_timeout_ms = ms;
        }
        if let Some(column) = non_empty("RECORDKIT_ID_COLUMN") {
            self.database.id_column = column;
        }
        if let Some(mode) = non_empty("RECORDKIT_BATCH_MODE") {
            apply_batch_mode(&mut self.database, &mode);
        }
        if let Some(format) = non_empty("RECORDKIT_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&format);
        }
        if let Some(filter) = non_empty("RECORDKIT_LOG_FILTER") {
            self.logging.filter = Some(filter);
        }

        self
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database.path = Some(path.into());
        self
    }

    /// Converts a `ConfigFile` to `RecordkitConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(database) = file.database {
            if let Some(path) = database.path {
                config.database.path = Some(PathBuf::from(path));
            }
            if let Some(ms) = database.ping_timeout_ms {
                config.database.ping_timeout_ms = ms;
            }
            if let Some(ms) = database.busy_timeout_ms {
                config.database.busy_timeout_ms = ms;
            }
            if let Some(column) = database.id_column {
                config.database.id_column = column;
            }
            if let Some(mode) = database.batch_mode {
                apply_batch_mode(&mut config.database, &mode);
            }
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            config.logging.filter = logging.filter;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }
}

fn apply_batch_mode(database: &mut DatabaseConfig, value: &str) {
    match BatchMode::parse(value) {
        Some(mode) => database.batch_mode = mode,
        None => tracing::warn!(
            value,
            "unknown batch mode, keeping {}",
            database.batch_mode.as_str()
        ),
    }
}

fn parse_millis(key: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<u64> {
    let value = lookup(key)?;
    value.trim().parse().map_or_else(
        |_| {
            tracing::warn!(key, value = %value, "expected milliseconds, ignoring");
            None
        },
        Some,
    )
}

/// Loads a `.env` file from the working directory, if any.
///
/// Skipped when `RECORDKIT_ENV=production`. Variables already set in the
/// process environment are not overwritten.
pub fn load_dotenv() {
    if std::env::var("RECORDKIT_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("production")) {
        return;
    }
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {},
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }
}
