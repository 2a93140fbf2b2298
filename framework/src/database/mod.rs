//! SeaORM-backed database client
//!
//! The application does not open connections itself: it runs whatever factory
//! was handed to `Application::install_db`. `installer` builds such a factory
//! for a SeaORM pool.
//!
//! ```rust,ignore
//! use ignition::database::{self, DatabaseConfig, DbConnection};
//!
//! if let Some(config) = DatabaseConfig::from_env() {
//!     app.install_db(debug, database::installer(config.logging(debug)));
//! }
//!
//! // after run_db()
//! let conn: DbConnection = app.database().expect("database installed");
//! ```

mod config;
mod connection;

pub use config::DatabaseConfig;
pub use connection::DbConnection;

use crate::error::FrameworkError;
use crate::BoxFuture;

/// Factory that connects a `DbConnection` when invoked
pub fn installer(
    config: DatabaseConfig,
) -> impl FnOnce() -> BoxFuture<Result<DbConnection, FrameworkError>> + Send + 'static {
    move || -> BoxFuture<Result<DbConnection, FrameworkError>> {
        Box::pin(async move { DbConnection::connect(&config).await })
    }
}

// Re-export sea_orm types that users commonly need
pub use sea_orm;
