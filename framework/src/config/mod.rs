//! Configuration
//!
//! - `.env` loading with environment-based precedence
//! - `Configuration`: the typed run options read by `Application::run`
//! - `ServerConfig` / `AppConfig`: listener address and application identity
//!
//! # Example
//!
//! ```rust,ignore
//! use ignition::config::{Config, Configuration, ServerConfig};
//!
//! let env = Config::init(std::path::Path::new("."));
//! let server = ServerConfig::from_env();
//! let run = Configuration::from_env().expect("invalid configuration");
//! println!("{} on {} (shutdown after {:?})", env, server.addr(), run.shutdown_timeout());
//! ```

mod configuration;
pub mod env;
pub mod providers;

pub use configuration::Configuration;
pub use env::{env, env_optional, env_parsed, load_dotenv, Environment};
pub use providers::{AppConfig, ServerConfig};

use std::path::Path;

/// Entry point for process configuration
pub struct Config;

impl Config {
    /// Load `.env` files from `project_root` and report the detected environment
    ///
    /// Call once at startup, before reading any configuration.
    pub fn init(project_root: &Path) -> Environment {
        env::load_dotenv(project_root)
    }

    /// Current environment from `APP_ENV`
    pub fn environment() -> Environment {
        Environment::detect()
    }

    pub fn is_production() -> bool {
        Self::environment().is_production()
    }
}
