//! HTTP server, runners and shutdown plumbing

pub mod interrupt;
pub mod runner;
pub mod shutdown;

pub use interrupt::{os_signal, Interrupt, InterruptHook};
pub use runner::{HostConfig, HostConfigurator, Runner};
pub use shutdown::{guarded, ShutdownHandle, ShutdownSignal};

use crate::error::FrameworkError;
use crate::http::{HttpResponse, Request};
use crate::middleware::{BoxedMiddleware, MiddlewareChain, MiddlewareRegistry};
use crate::routing::Router;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::sync::Arc;

/// Route table plus global middleware
#[derive(Clone, Default)]
pub struct Server {
    router: Arc<Router>,
    middleware: MiddlewareRegistry,
}

impl Server {
    pub fn new(router: impl Into<Router>) -> Self {
        Self {
            router: Arc::new(router.into()),
            middleware: MiddlewareRegistry::new(),
        }
    }

    pub fn set_router(&mut self, router: impl Into<Router>) {
        self.router = Arc::new(router.into());
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Append global middleware, keeping the given order
    pub fn use_middleware(&mut self, middleware: impl IntoIterator<Item = BoxedMiddleware>) {
        self.middleware.extend(middleware);
    }

    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.middleware
    }

    /// Dispatch one request through global middleware, route middleware and
    /// the matched handler
    pub async fn handle(&self, request: Request) -> HttpResponse {
        let Some(matched) = self.router.match_route(request.method(), request.path()) else {
            return HttpResponse::text("404 Not Found").status(404);
        };

        let mut chain = MiddlewareChain::new();
        chain.extend(self.middleware.global_middleware().iter().cloned());
        chain.extend(matched.middleware);

        // Both Ok and Err carry a response
        chain
            .execute(request.with_params(matched.params), matched.handler)
            .await
            .unwrap_or_else(|e| e)
    }

    async fn handle_hyper(
        &self,
        req: hyper::Request<hyper::body::Incoming>,
    ) -> hyper::Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read request body");
                return HttpResponse::text("400 Bad Request").status(400).into_hyper();
            }
        };

        self.handle(Request::new(parts, body)).await.into_hyper()
    }

    /// Accept connections until `signal` asks to stop, then drain
    ///
    /// Returns once every connection finished or the drain was abandoned.
    pub async fn serve(
        &self,
        runner: Runner,
        signal: ShutdownSignal,
        startup_log: bool,
    ) -> Result<(), FrameworkError> {
        let (listener, addr, host) = runner.bind().await?;
        let builder = host.builder();
        let graceful = GracefulShutdown::new();

        if startup_log {
            tracing::info!("Now listening on: http://{}", addr);
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };

                    let server = self.clone();
                    let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                        let server = server.clone();
                        async move { Ok::<_, Infallible>(server.handle_hyper(req).await) }
                    });

                    let conn = graceful.watch(builder.serve_connection(TokioIo::new(stream), service));
                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            tracing::debug!(%peer, error = %e, "connection closed with error");
                        }
                    });
                }
                () = signal.requested() => break,
            }
        }

        drop(listener);
        tracing::debug!("listener closed; draining connections");

        tokio::select! {
            () = graceful.shutdown() => {}
            () = signal.abandoned() => {
                tracing::warn!("dropping connections still open after the shutdown timeout");
            }
        }

        signal.finish();
        Ok(())
    }
}
