use crate::error::FrameworkError;
use std::path::Path;
use std::str::FromStr;

/// Deployment environment, read from `APP_ENV`
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Local,
    Development,
    Staging,
    Production,
    Testing,
    Custom(String),
}

impl Environment {
    /// Detect environment from APP_ENV or default to Local
    pub fn detect() -> Self {
        match std::env::var("APP_ENV").ok().as_deref() {
            Some(value) => Self::parse(value),
            None => Self::Local,
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            "testing" => Self::Testing,
            "local" | "" => Self::Local,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Testing => "testing",
            Self::Custom(name) => name.as_str(),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Local or development
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Local | Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load environment variables from .env files
///
/// Precedence, highest first: real environment variables,
/// `.env.{environment}.local`, `.env.{environment}`, `.env.local`, `.env`.
/// dotenvy never overwrites a variable that is already set, so files are read
/// from most to least specific. Missing files are skipped.
///
/// The environment comes from a real `APP_ENV` when set, otherwise from an
/// `APP_ENV` line in `.env.local` or `.env`.
pub fn load_dotenv(project_root: &Path) -> Environment {
    let env = match std::env::var_os("APP_ENV") {
        Some(_) => Environment::detect(),
        None => file_environment(project_root).unwrap_or(Environment::Local),
    };
    let suffix = env.as_str().to_string();

    let candidates = [
        project_root.join(format!(".env.{}.local", suffix)),
        project_root.join(format!(".env.{}", suffix)),
        project_root.join(".env.local"),
        project_root.join(".env"),
    ];

    for path in candidates.iter() {
        if dotenvy::from_path(path).is_ok() {
            tracing::debug!(path = %path.display(), "loaded env file");
        }
    }

    // A file may have set APP_ENV itself
    Environment::detect()
}

/// `APP_ENV` as written in `.env.local` or, failing that, `.env`
fn file_environment(project_root: &Path) -> Option<Environment> {
    [".env.local", ".env"].iter().find_map(|name| {
        dotenvy::from_path_iter(project_root.join(name))
            .ok()?
            .filter_map(Result::ok)
            .find(|(key, _)| key == "APP_ENV")
            .map(|(_, value)| Environment::parse(&value))
    })
}

/// Get an environment variable, falling back to `default` when unset or unparsable
///
/// # Example
/// ```
/// use ignition::config::env;
///
/// let port: u16 = env("SERVER_PORT", 8080);
/// ```
pub fn env<T: FromStr>(key: &str, default: T) -> T {
    env_optional(key).unwrap_or(default)
}

/// Get an optional environment variable
pub fn env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Get an environment variable, rejecting values that do not parse
///
/// Unset and empty variables yield `Ok(None)`.
pub fn env_parsed<T>(key: &str) -> Result<Option<T>, FrameworkError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| FrameworkError::config(key, format!("'{}': {}", raw, e))),
        Err(_) => Ok(None),
    }
}
