//! Structured logging settings.

use std::path::PathBuf;

/// Output format of the `fmt` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-oriented output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; unknown names fall back to `Pretty`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directives, e.g. `recordkit=debug`. `RUST_LOG` is used
    /// when unset.
    pub filter: Option<String>,
    /// Append log output to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Returns the filter directives to install.
    ///
    /// An explicit filter wins; otherwise `verbose` selects `debug` and the
    /// default is `warn`.
    #[must_use]
    pub fn directives(&self, verbose: bool) -> String {
        if let Some(filter) = &self.filter {
            return filter.clone();
        }
        if let Ok(env) = std::env::var("RUST_LOG") {
            return env;
        }
        if verbose { "recordkit=debug" } else { "warn" }.to_string()
    }
}
