use crate::config::env::{env, env_optional};

/// Connection pool settings
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds
    pub connect_timeout: u64,
    /// Log every SQL statement
    pub logging: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: 30,
            logging: false,
        }
    }

    /// Read `DATABASE_URL` and the `DB_*` pool settings
    ///
    /// Returns `None` when `DATABASE_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let url: String = env_optional("DATABASE_URL")?;
        let defaults = Self::new(url);
        Some(Self {
            max_connections: env("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env("DB_MIN_CONNECTIONS", defaults.min_connections),
            connect_timeout: env("DB_CONNECT_TIMEOUT", defaults.connect_timeout),
            logging: env("DB_LOGGING", defaults.logging),
            ..defaults
        })
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self.min_connections = self.min_connections.min(max);
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }
}
