//! Run options for the demo service

use ignition::{Configuration, FrameworkError};
use std::path::Path;

/// Read run options from `path` when given, otherwise from the environment
pub fn load(path: Option<&Path>) -> Result<Configuration, FrameworkError> {
    match path {
        Some(path) => {
            let configuration = Configuration::from_json_file(path)?;
            tracing::debug!(path = %path.display(), "loaded run options");
            Ok(configuration)
        }
        None => Configuration::from_env(),
    }
}
