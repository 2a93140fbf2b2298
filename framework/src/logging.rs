//! Application logger
//!
//! All framework events go through `tracing`. The first `Logger` installs a
//! global fmt subscriber whose level sits behind a reload layer, so
//! `Logger::set_level` applies at runtime. Timestamps are local time in
//! `%Y-%m-%d %H:%M:%S%.3f` form.

use crate::error::FrameworkError;
use serde::Serialize;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

type LevelHandle = reload::Handle<LevelFilter, Registry>;

/// Process-wide level plus the reload handle of the subscriber installed by
/// this crate, if it won the race
struct LevelState {
    level: RwLock<LogLevel>,
    handle: Option<LevelHandle>,
}

static LEVEL_STATE: OnceLock<LevelState> = OnceLock::new();

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Disable,
    Fatal,
    Error,
    Warn,
    Info,
    #[default]
    Debug,
    Trace,
}

impl LogLevel {
    /// `Fatal` maps onto `ERROR`; tracing has no separate fatal level
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Disable => LevelFilter::OFF,
            Self::Fatal | Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" | "disabled" | "off" => Ok(Self::Disable),
            "fatal" => Ok(Self::Fatal),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format(TIME_FORMAT))
    }
}

fn install_subscriber() -> Option<LevelHandle> {
    let (filter, handle) = reload::Layer::new(LogLevel::default().to_level_filter());
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_timer(LocalTime))
        .try_init();

    // Another subscriber (a test harness, the host binary) got there first
    installed.ok().map(|_| handle)
}

/// Handle to the application's log level
///
/// There is one subscriber per process, so every `Logger` sees the same
/// level.
#[derive(Clone, Copy)]
pub struct Logger {
    state: &'static LevelState,
}

impl Logger {
    /// Create a logger, installing the global subscriber on first use
    pub fn new() -> Self {
        let state = LEVEL_STATE.get_or_init(|| LevelState {
            level: RwLock::new(LogLevel::default()),
            handle: install_subscriber(),
        });
        Self { state }
    }

    pub fn level(&self) -> LogLevel {
        self.state
            .level
            .read()
            .map(|level| *level)
            .unwrap_or_default()
    }

    /// Change the level of the global subscriber
    pub fn set_level(&self, level: LogLevel) -> Result<(), FrameworkError> {
        if let Ok(mut current) = self.state.level.write() {
            *current = level;
        }

        match &self.state.handle {
            Some(handle) => handle
                .reload(level.to_level_filter())
                .map_err(|e| FrameworkError::internal(format!("failed to set log level: {}", e))),
            None => {
                tracing::debug!(%level, "log level recorded; subscriber not owned by ignition");
                Ok(())
            }
        }
    }

    /// Whether this logger controls the process-wide subscriber
    pub fn owns_subscriber(&self) -> bool {
        self.state.handle.is_some()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("disable".parse::<LogLevel>(), Ok(LogLevel::Disable));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_filters() {
        assert_eq!(LogLevel::Fatal.to_level_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Disable.to_level_filter(), LevelFilter::OFF);
        assert_eq!(LogLevel::Trace.to_level_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn test_set_level_is_shared_between_loggers() {
        // Every level change in this test binary is to Warn, so parallel
        // tests cannot interleave a different value
        let first = Logger::new();
        let second = Logger::new();

        first.set_level(LogLevel::Warn).unwrap();
        assert_eq!(second.level(), LogLevel::Warn);
        assert_eq!(first.owns_subscriber(), second.owns_subscriber());
    }

    #[test]
    fn test_time_format() {
        let formatted = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_milli_opt(8, 30, 5, 7))
            .unwrap()
            .format(TIME_FORMAT)
            .to_string();
        assert_eq!(formatted, "2024-03-09 08:30:05.007");
    }
}
