pub mod app;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod install;
pub mod logging;
pub mod middleware;
pub mod routing;
pub mod server;

use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future used by handlers, middleware and factories
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub use app::{Application, Serving};
pub use cache::{CacheStore, MemoryCache, RedisCache};
pub use config::{Config, Configuration, Environment};
pub use database::{DatabaseConfig, DbConnection};
pub use error::FrameworkError;
pub use http::{json, text, HttpResponse, Request, Response, ResponseExt};
pub use install::Install;
pub use logging::{LogLevel, Logger};
pub use middleware::{Middleware, MiddlewareRegistry, Next};
pub use routing::Router;
pub use server::{HostConfig, Runner, Server, ShutdownHandle};

// Re-export async_trait for middleware and cache implementations
pub use async_trait::async_trait;
