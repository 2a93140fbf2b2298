//! Deferred client construction
//!
//! An `Install<T>` holds a factory registered during setup and the value it
//! produced once `run` has been called.

use crate::error::FrameworkError;
use crate::BoxFuture;
use std::future::Future;

/// Boxed one-shot factory
pub type Factory<T> = Box<dyn FnOnce() -> BoxFuture<Result<T, FrameworkError>> + Send>;

/// A client slot: debug flag, pending factory, produced client
pub struct Install<T> {
    debug: bool,
    factory: Option<Factory<T>>,
    client: Option<T>,
}

impl<T> Install<T> {
    pub fn new() -> Self {
        Self {
            debug: false,
            factory: None,
            client: None,
        }
    }

    /// Register a factory, replacing one that has not run yet
    ///
    /// Once the slot holds a client, later registrations are ignored.
    pub fn set<F, Fut>(&mut self, debug: bool, factory: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FrameworkError>> + Send + 'static,
        T: 'static,
    {
        if self.client.is_some() {
            tracing::warn!("client already constructed; ignoring new factory");
            return;
        }
        self.debug = debug;
        self.factory = Some(Box::new(move || -> BoxFuture<Result<T, FrameworkError>> {
            Box::pin(factory())
        }));
    }

    /// Invoke the factory if one is pending
    ///
    /// Returns `Ok(true)` when the factory ran and produced a client. The
    /// factory is consumed before it is awaited, so it runs at most once
    /// even when it fails.
    pub async fn run(&mut self) -> Result<bool, FrameworkError> {
        let Some(factory) = self.factory.take() else {
            return Ok(false);
        };
        self.client = Some(factory().await?);
        Ok(true)
    }

    /// Map the produced client in place, e.g. to wrap it in a decorator
    pub fn map(&mut self, f: impl FnOnce(T) -> T) {
        self.client = self.client.take().map(f);
    }

    pub fn client(&self) -> Option<&T> {
        self.client.as_ref()
    }

    /// Whether a factory was registered (run or not)
    pub fn is_installed(&self) -> bool {
        self.factory.is_some() || self.client.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.factory.is_some()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }
}

impl<T> Default for Install<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Install<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Install")
            .field("debug", &self.debug)
            .field("pending", &self.factory.is_some())
            .field("constructed", &self.client.is_some())
            .finish()
    }
}
