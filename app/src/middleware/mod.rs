//! Application middleware
//!
//! Each middleware has its own dedicated file.

mod logging;
mod request_id;

pub use logging::LoggingMiddleware;
pub use request_id::{RequestId, RequestIdMiddleware};
