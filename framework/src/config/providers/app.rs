use crate::config::env::{env, Environment};

/// Application identity
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shown in the startup banner
    pub name: String,
    pub environment: Environment,
    pub debug: bool,
}

impl AppConfig {
    /// Build config from `APP_NAME`, `APP_ENV` and `APP_DEBUG`
    pub fn from_env() -> Self {
        let environment = Environment::detect();
        Self {
            name: env("APP_NAME", "ignition".to_string()),
            debug: env("APP_DEBUG", !environment.is_production()),
            environment,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
