use crate::error::FrameworkError;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Draining,
    Abandoned,
}

/// Create a connected handle/signal pair
pub fn channel() -> (ShutdownHandle, ShutdownSignal) {
    let (phase_tx, phase_rx) = watch::channel(Phase::Running);
    let (done_tx, done_rx) = watch::channel(false);
    (
        ShutdownHandle {
            phase: Arc::new(phase_tx),
            done: done_rx,
        },
        ShutdownSignal {
            phase: phase_rx,
            done: done_tx,
        },
    )
}

/// Stops a running server
///
/// Clones control the same server.
#[derive(Clone)]
pub struct ShutdownHandle {
    phase: Arc<watch::Sender<Phase>>,
    done: watch::Receiver<bool>,
}

impl ShutdownHandle {
    /// Stop accepting connections and wait for in-flight ones to finish
    ///
    /// When draining takes longer than `timeout` the server is told to drop
    /// the remaining connections and `ShutdownTimeout` is returned.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), FrameworkError> {
        self.phase.send_if_modified(|phase| {
            if *phase == Phase::Running {
                *phase = Phase::Draining;
                true
            } else {
                false
            }
        });

        let mut done = self.done.clone();
        let drained = tokio::time::timeout(timeout, async move {
            // An Err means the serve loop is gone, which is as good as done
            let _ = done.wait_for(|finished| *finished).await;
        })
        .await;

        match drained {
            Ok(()) => Ok(()),
            Err(_) => {
                self.phase.send_replace(Phase::Abandoned);
                Err(FrameworkError::ShutdownTimeout(timeout))
            }
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.phase.borrow() != Phase::Running
    }

    pub fn is_finished(&self) -> bool {
        *self.done.borrow()
    }
}

/// Server side of a `ShutdownHandle`
pub struct ShutdownSignal {
    phase: watch::Receiver<Phase>,
    done: watch::Sender<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown was requested or every handle was dropped
    pub async fn requested(&self) {
        let mut phase = self.phase.clone();
        let _ = phase.wait_for(|phase| *phase != Phase::Running).await;
    }

    /// Resolves once the drain deadline passed
    pub async fn abandoned(&self) {
        let mut phase = self.phase.clone();
        let _ = phase.wait_for(|phase| *phase == Phase::Abandoned).await;
    }

    /// Report that the server has stopped
    pub fn finish(self) {
        self.done.send_replace(true);
    }
}

/// Run `fut` on its own task, turning a panic into an error
///
/// ```rust,ignore
/// let result = guarded(async move { handle.shutdown(timeout).await }).await;
/// ```
pub async fn guarded<F>(fut: F) -> Result<(), FrameworkError>
where
    F: Future<Output = Result<(), FrameworkError>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(FrameworkError::Shutdown(panic_message(e.into_panic()))),
        Err(e) => Err(FrameworkError::Shutdown(e.to_string())),
    }
}

/// Bounded shutdown run from the interrupt hook
///
/// Failures (including panics) are logged and returned, never propagated as
/// a panic.
pub async fn shutdown_server(handle: ShutdownHandle, timeout: Duration) -> Result<(), FrameworkError> {
    tracing::info!(?timeout, "shutting down server");
    let result = guarded(async move { handle.shutdown(timeout).await }).await;
    match &result {
        Ok(()) => tracing::info!("server stopped"),
        Err(e) => tracing::error!(error = %e, "server shutdown failed"),
    }
    result
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
