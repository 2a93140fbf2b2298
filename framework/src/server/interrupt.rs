use crate::BoxFuture;
use std::future::Future;
use tokio::signal;

pub type InterruptHook = Box<dyn FnOnce() -> BoxFuture<()> + Send>;

/// Callbacks run once when the process is asked to stop
///
/// Hooks run sequentially in registration order. Each runs on its own task,
/// so a panicking hook is logged and the remaining hooks still run.
#[derive(Default)]
pub struct Interrupt {
    hooks: Vec<(String, InterruptHook)>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: InterruptHook = Box::new(move || -> BoxFuture<()> { Box::pin(hook()) });
        self.hooks.push((name.into(), hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook now
    pub async fn fire(self) {
        for (name, hook) in self.hooks {
            tracing::debug!(hook = %name, "running interrupt hook");
            if let Err(e) = tokio::spawn(hook()).await {
                tracing::error!(hook = %name, error = %e, "interrupt hook failed");
            }
        }
    }

    /// Wait for `trigger`, then run every hook
    pub async fn fire_on<S>(self, trigger: S)
    where
        S: Future<Output = ()>,
    {
        trigger.await;
        self.fire().await;
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn os_signal() {
    let name = tokio::select! {
        () = sigint() => "SIGINT",
        () = sigterm() => "SIGTERM",
    };
    tracing::info!("received {}", name);
}

async fn sigint() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

async fn sigterm() {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}
