//! Framework-wide error types
//!
//! Every fallible bootstrap step (installing clients, loading configuration,
//! binding the listener, shutting down) reports through `FrameworkError`, so
//! the entry point decides whether to log and continue or abort.

use std::time::Duration;
use thiserror::Error;

/// Framework-wide error type
///
/// # Example
///
/// ```rust,ignore
/// use ignition::{Application, FrameworkError};
///
/// async fn boot(app: &mut Application) -> Result<(), FrameworkError> {
///     app.run_db().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal {
        /// The error message
        message: String,
    },

    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(String),

    /// Cache client error
    #[error("Cache error: {0}")]
    Cache(String),

    /// A configuration value was missing or malformed
    #[error("Invalid configuration '{key}': {message}")]
    Config {
        /// The option or environment key that was rejected
        key: String,
        /// What was wrong with it
        message: String,
    },

    /// Socket or filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// A lifecycle hook failed during `Application::run`
    #[error("Hook '{name}' failed: {message}")]
    Hook {
        /// Name the hook was registered under
        name: String,
        /// The failure reported by the hook
        message: String,
    },

    /// The shutdown routine failed or panicked
    #[error("Shutdown failed: {0}")]
    Shutdown(String),

    /// In-flight connections did not drain within the shutdown timeout
    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

impl FrameworkError {
    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create a Cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Create a Config error for the given key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a Hook error
    pub fn hook(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a Shutdown error
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Database(_) | Self::Cache(_) => 503,
            _ => 500,
        }
    }
}

impl From<sea_orm::DbErr> for FrameworkError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<redis::RedisError> for FrameworkError {
    fn from(e: redis::RedisError) -> Self {
        Self::Cache(e.to_string())
    }
}

impl From<std::io::Error> for FrameworkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for FrameworkError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(FrameworkError::cache("down").status_code(), 503);
        assert_eq!(FrameworkError::database("down").status_code(), 503);
        assert_eq!(FrameworkError::internal("oops").status_code(), 500);
    }

    #[test]
    fn test_display() {
        let err = FrameworkError::config("shutdown_second", "expected an integer");
        assert_eq!(
            err.to_string(),
            "Invalid configuration 'shutdown_second': expected an integer"
        );

        let err = FrameworkError::ShutdownTimeout(Duration::from_secs(2));
        assert_eq!(err.to_string(), "Shutdown did not complete within 2s");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err: FrameworkError = io.into();
        assert!(matches!(err, FrameworkError::Io(ref m) if m.contains("address in use")));
    }
}
