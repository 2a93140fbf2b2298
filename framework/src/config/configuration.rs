use super::env::env_parsed;
use crate::error::FrameworkError;
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

const LOGGER_LEVEL: &str = "logger_level";
const SHUTDOWN_SECOND: &str = "shutdown_second";
const DISABLE_STARTUP_LOG: &str = "disable_startup_log";
const DISABLE_INTERRUPT_HANDLER: &str = "disable_interrupt_handler";

/// Run configuration consumed by `Application::run`
///
/// Every option is validated when the configuration is loaded; a malformed
/// value is a `FrameworkError::Config` naming the offending key. Keys this
/// struct does not know about are kept in `other`. Deserializing goes through
/// the same checks, and missing keys keep their defaults.
///
/// # Example
///
/// ```rust,ignore
/// let config = Configuration::from_json_str(r#"{ "logger_level": "info", "shutdown_second": 5 }"#)?;
/// assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Configuration {
    /// Level applied to the logger right before serving (default: debug)
    pub logger_level: LogLevel,
    /// Upper bound, in seconds, for the graceful shutdown (default: 2)
    pub shutdown_second: u64,
    /// Skip the "Now listening on" banner
    pub disable_startup_log: bool,
    /// Do not shut down on SIGINT/SIGTERM
    pub disable_interrupt_handler: bool,
    /// Unrecognised options, untouched
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            logger_level: LogLevel::Debug,
            shutdown_second: 2,
            disable_startup_log: false,
            disable_interrupt_handler: false,
            other: Map::new(),
        }
    }
}

impl TryFrom<Map<String, Value>> for Configuration {
    type Error = FrameworkError;

    fn try_from(options: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_options(options)
    }
}

impl Configuration {
    /// Read `LOGGER_LEVEL`, `SHUTDOWN_SECOND`, `DISABLE_STARTUP_LOG` and
    /// `DISABLE_INTERRUPT_HANDLER`; unset variables keep their defaults
    pub fn from_env() -> Result<Self, FrameworkError> {
        let defaults = Self::default();
        Ok(Self {
            logger_level: env_parsed("LOGGER_LEVEL")?.unwrap_or(defaults.logger_level),
            shutdown_second: env_parsed("SHUTDOWN_SECOND")?.unwrap_or(defaults.shutdown_second),
            disable_startup_log: env_parsed("DISABLE_STARTUP_LOG")?
                .unwrap_or(defaults.disable_startup_log),
            disable_interrupt_handler: env_parsed("DISABLE_INTERRUPT_HANDLER")?
                .unwrap_or(defaults.disable_interrupt_handler),
            other: Map::new(),
        })
    }

    /// Build from an option bag, checking each known key's type
    pub fn from_options(mut options: Map<String, Value>) -> Result<Self, FrameworkError> {
        let mut config = Self::default();

        if let Some(value) = options.remove(LOGGER_LEVEL) {
            let raw = value
                .as_str()
                .ok_or_else(|| FrameworkError::config(LOGGER_LEVEL, "expected a string"))?;
            config.logger_level = raw
                .parse()
                .map_err(|e: String| FrameworkError::config(LOGGER_LEVEL, e))?;
        }

        if let Some(value) = options.remove(SHUTDOWN_SECOND) {
            config.shutdown_second = value.as_u64().ok_or_else(|| {
                FrameworkError::config(SHUTDOWN_SECOND, "expected a non-negative integer")
            })?;
        }

        if let Some(value) = options.remove(DISABLE_STARTUP_LOG) {
            config.disable_startup_log = flag(DISABLE_STARTUP_LOG, &value)?;
        }

        if let Some(value) = options.remove(DISABLE_INTERRUPT_HANDLER) {
            config.disable_interrupt_handler = flag(DISABLE_INTERRUPT_HANDLER, &value)?;
        }

        config.other = options;
        Ok(config)
    }

    /// Parse a JSON object of options
    pub fn from_json_str(json: &str) -> Result<Self, FrameworkError> {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(options)) => Self::from_options(options),
            Ok(_) => Err(FrameworkError::config("configuration", "expected a JSON object")),
            Err(e) => Err(FrameworkError::config("configuration", e.to_string())),
        }
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FrameworkError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FrameworkError::config(path.display().to_string(), e.to_string())
        })?;
        Self::from_json_str(&contents)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_second)
    }

    /// Look up an option that has no dedicated field
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.other.get(key)
    }

    pub fn with_logger_level(mut self, level: LogLevel) -> Self {
        self.logger_level = level;
        self
    }

    pub fn with_shutdown_second(mut self, seconds: u64) -> Self {
        self.shutdown_second = seconds;
        self
    }

    pub fn with_startup_log(mut self, enabled: bool) -> Self {
        self.disable_startup_log = !enabled;
        self
    }

    pub fn with_interrupt_handler(mut self, enabled: bool) -> Self {
        self.disable_interrupt_handler = !enabled;
        self
    }
}

fn flag(key: &str, value: &Value) -> Result<bool, FrameworkError> {
    value
        .as_bool()
        .ok_or_else(|| FrameworkError::config(key, "expected a boolean"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.logger_level, LogLevel::Debug);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(2));
        assert!(!config.disable_startup_log);
    }

    #[test]
    fn test_from_json_keeps_unknown_options() {
        let config = Configuration::from_json_str(
            r#"{ "logger_level": "info", "shutdown_second": 7, "region": "eu-west-1" }"#,
        )
        .unwrap();

        assert_eq!(config.logger_level, LogLevel::Info);
        assert_eq!(config.shutdown_second, 7);
        assert_eq!(config.option("region"), Some(&Value::from("eu-west-1")));
        assert_eq!(config.option(LOGGER_LEVEL), None);
    }

    #[test]
    fn test_malformed_options_are_rejected() {
        let err = Configuration::from_json_str(r#"{ "shutdown_second": "soon" }"#).unwrap_err();
        assert!(matches!(err, FrameworkError::Config { ref key, .. } if key == SHUTDOWN_SECOND));

        let err = Configuration::from_json_str(r#"{ "shutdown_second": -1 }"#).unwrap_err();
        assert!(matches!(err, FrameworkError::Config { ref key, .. } if key == SHUTDOWN_SECOND));

        let err = Configuration::from_json_str(r#"{ "logger_level": 3 }"#).unwrap_err();
        assert!(matches!(err, FrameworkError::Config { ref key, .. } if key == LOGGER_LEVEL));

        let err = Configuration::from_json_str(r#"{ "logger_level": "chatty" }"#).unwrap_err();
        assert!(matches!(err, FrameworkError::Config { ref key, .. } if key == LOGGER_LEVEL));

        assert!(Configuration::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        #[derive(Deserialize)]
        struct Settings {
            #[serde(default)]
            server: Configuration,
        }

        let settings: Settings =
            serde_json::from_str(r#"{ "server": { "shutdown_second": 9, "zone": "b" } }"#).unwrap();
        assert_eq!(settings.server.shutdown_second, 9);
        assert_eq!(settings.server.logger_level, LogLevel::Debug);
        assert_eq!(settings.server.option("zone"), Some(&Value::from("b")));

        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.server, Configuration::default());

        let err = serde_json::from_str::<Settings>(r#"{ "server": { "logger_level": "chatty" } }"#)
            .err()
            .unwrap();
        assert!(err.to_string().contains(LOGGER_LEVEL), "{}", err);
    }

    #[test]
    fn test_serialize_flattens_other_options() {
        let config = Configuration::from_json_str(r#"{ "region": "eu-west-1" }"#).unwrap();
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value["region"], Value::from("eu-west-1"));
        assert_eq!(value["logger_level"], Value::from("debug"));
        assert_eq!(Configuration::try_from(value.as_object().cloned().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_builders() {
        let config = Configuration::default()
            .with_logger_level(LogLevel::Warn)
            .with_shutdown_second(0)
            .with_startup_log(false)
            .with_interrupt_handler(false);

        assert_eq!(config.logger_level, LogLevel::Warn);
        assert_eq!(config.shutdown_timeout(), Duration::ZERO);
        assert!(config.disable_startup_log);
        assert!(config.disable_interrupt_handler);
    }
}
