//! Log configuration shared by the CLI and library callers.
//!
//! Options start from `NATBIND_LOG_FORMAT` / `NATBIND_LOG_LEVEL` and are then overridden
//! by `--log-format` / `--log-level`.

use std::env;
use std::fmt;

pub const FORMAT_ENV: &str = "NATBIND_LOG_FORMAT";
pub const LEVEL_ENV: &str = "NATBIND_LOG_LEVEL";

/// Output format for pipeline log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" | "compact" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

/// Effective log configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    /// Generation is quiet unless asked: per-run events are `info`, failures `warn`.
    pub const DEFAULT: Self = Self {
        format: LogFormat::Auto,
        level: LogLevel::Warn,
    };

    #[must_use]
    pub fn with_overrides(base: Self, overrides: LogSettings) -> Self {
        Self {
            format: overrides.format.unwrap_or(base.format),
            level: overrides.level.unwrap_or(base.level),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        let format = env::var(FORMAT_ENV).ok();
        let level = env::var(LEVEL_ENV).ok();
        apply_env_overrides(Self::DEFAULT, format.as_deref(), level.as_deref())
    }

    /// Replace `Auto` with the concrete format the subscriber installs.
    #[must_use]
    pub fn resolved(self) -> Self {
        let format = match self.format {
            LogFormat::Auto => LogFormat::Text,
            other => other,
        };
        Self { format, ..self }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Logging flags given on the command line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub format: Option<LogFormat>,
    pub level: Option<LogLevel>,
}

impl LogSettings {
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.level.is_none()
    }

    #[must_use]
    pub fn merged_with_env(self) -> LogOptions {
        LogOptions::with_overrides(LogOptions::from_env(), self)
    }
}

/// Unparseable environment values are ignored rather than rejected.
fn apply_env_overrides(
    mut options: LogOptions,
    format: Option<&str>,
    level: Option<&str>,
) -> LogOptions {
    if let Some(spec) = format.and_then(LogFormat::parse) {
        options.format = spec;
    }
    if let Some(spec) = level.and_then(LogLevel::parse) {
        options.level = spec;
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_and_levels_parse_case_insensitively() {
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("compact"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);

        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" debug "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("verbose"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("loud"), None);
        assert!(LogLevel::Warn < LogLevel::Info);
    }

    #[test]
    fn environment_values_override_defaults() {
        let opts = apply_env_overrides(LogOptions::DEFAULT, Some("json"), Some("debug"));
        assert_eq!(opts.format, LogFormat::Json);
        assert_eq!(opts.level, LogLevel::Debug);

        let ignored = apply_env_overrides(LogOptions::DEFAULT, Some("xml"), Some("loud"));
        assert_eq!(ignored, LogOptions::DEFAULT);
    }

    #[test]
    fn cli_settings_override_environment() {
        let env_opts = apply_env_overrides(LogOptions::DEFAULT, Some("text"), Some("info"));
        let merged = LogOptions::with_overrides(
            env_opts,
            LogSettings {
                format: Some(LogFormat::Json),
                level: None,
            },
        );
        assert_eq!(merged.format, LogFormat::Json);
        assert_eq!(merged.level, LogLevel::Info);
    }

    #[test]
    fn auto_resolves_to_text() {
        assert_eq!(LogOptions::DEFAULT.resolved().format, LogFormat::Text);
        let json = LogOptions {
            format: LogFormat::Json,
            level: LogLevel::Trace,
        };
        assert_eq!(json.resolved(), json);
    }
}
