//! Application lifecycle
//!
//! An `Application` collects everything a service needs before it serves:
//! client factories, middleware, lifecycle hooks and the route table. `run`
//! then brings it up in a fixed order.
//!
//! # Example
//!
//! ```rust,ignore
//! use ignition::{database, Application, Configuration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ignition::FrameworkError> {
//!     let mut app = Application::new();
//!     app.install_db(false, database::installer(DatabaseConfig::new("sqlite::memory:")));
//!     app.install_middleware(LoggingMiddleware);
//!     app.routes(routes::register());
//!
//!     let runner = app.create_runner("127.0.0.1:8080", vec![]);
//!     app.run(runner, Configuration::from_env()?).await
//! }
//! ```

use crate::cache::{self, CacheStore};
use crate::config::Configuration;
use crate::error::FrameworkError;
use crate::install::Install;
use crate::logging::Logger;
use crate::middleware::{into_boxed, BoxedMiddleware, Middleware};
use crate::routing::Router;
use crate::server::{self, shutdown, HostConfigurator, Interrupt, Runner, Server, ShutdownSignal};
use crate::BoxFuture;
use std::any::Any;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

type DatabaseHandle = Arc<dyn Any + Send + Sync>;

pub type PrepareHook = Box<dyn FnOnce(&mut Application) -> Result<(), FrameworkError> + Send>;
pub type StarterHook = Box<dyn FnOnce(&Application) -> Result<(), FrameworkError> + Send>;

static GLOBAL: OnceLock<Mutex<Application>> = OnceLock::new();

pub struct Application {
    server: Server,
    pending_middleware: Vec<BoxedMiddleware>,
    logger: Logger,
    database: Install<DatabaseHandle>,
    cache: Install<Arc<dyn CacheStore>>,
    prepares: Vec<(String, PrepareHook)>,
    starters: Vec<(String, StarterHook)>,
    interrupt: Interrupt,
}

impl Application {
    pub fn new() -> Self {
        Self {
            server: Server::default(),
            pending_middleware: Vec::new(),
            logger: Logger::new(),
            database: Install::new(),
            cache: Install::new(),
            prepares: Vec::new(),
            starters: Vec::new(),
            interrupt: Interrupt::new(),
        }
    }

    /// Process-wide application, created on first access
    ///
    /// Every caller, on any thread, receives the same instance.
    pub fn global() -> &'static Mutex<Application> {
        GLOBAL.get_or_init(|| Mutex::new(Application::new()))
    }

    /// Register the database factory; it runs during `run_db`
    ///
    /// The produced handle is read back with `database::<T>()`.
    pub fn install_db<T, F, Fut>(&mut self, debug: bool, factory: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FrameworkError>> + Send + 'static,
    {
        self.database.set(debug, move || async move {
            let handle: DatabaseHandle = Arc::new(factory().await?);
            Ok::<_, FrameworkError>(handle)
        });
    }

    /// Register the cache factory; it runs during `run_db`
    ///
    /// With `debug` set, every cache command is logged.
    pub fn install_redis<C, F, Fut>(&mut self, debug: bool, factory: F)
    where
        C: CacheStore + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<C, FrameworkError>> + Send + 'static,
    {
        self.cache.set(debug, move || async move {
            let client: Arc<dyn CacheStore> = Arc::new(factory().await?);
            Ok::<_, FrameworkError>(client)
        });
    }

    /// Run the installed factories, each at most once
    ///
    /// Slots that were never installed stay empty; that is not an error.
    pub async fn run_db(&mut self) -> Result<(), FrameworkError> {
        if self.cache.run().await? {
            if self.cache.is_debug() {
                self.cache.map(cache::traced);
            }
            if let Some(client) = self.cache.client() {
                tracing::info!(backend = client.backend(), "cache client ready");
            }
        }

        if self.database.run().await? {
            tracing::info!(debug = self.database.is_debug(), "database ready");
        }

        Ok(())
    }

    /// Queue global middleware; applied by `run_middleware`
    pub fn install_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.pending_middleware.push(into_boxed(middleware));
    }

    /// Hand queued middleware to the server in the order it was installed
    pub fn run_middleware(&mut self) {
        let pending = std::mem::take(&mut self.pending_middleware);
        if pending.is_empty() {
            return;
        }
        tracing::debug!(count = pending.len(), "applying middleware");
        self.server.use_middleware(pending);
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn create_runner(
        &self,
        addr: impl Into<String>,
        configurators: impl IntoIterator<Item = HostConfigurator>,
    ) -> Runner {
        Runner::addr(addr).with(configurators)
    }

    /// Replace the route table
    pub fn routes(&mut self, router: impl Into<Router>) {
        self.server.set_router(router);
    }

    /// Hook run during `run` after the clients are constructed
    pub fn prepare<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce(&mut Application) -> Result<(), FrameworkError> + Send + 'static,
    {
        self.prepares.push((name.into(), Box::new(hook)));
    }

    /// Hook run during `run` right before the server starts
    pub fn starter<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce(&Application) -> Result<(), FrameworkError> + Send + 'static,
    {
        self.starters.push((name.into(), Box::new(hook)));
    }

    /// Callback run on interrupt, before the server shuts down
    pub fn on_interrupt<F, Fut>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.interrupt.register(name, hook);
    }

    /// The installed database handle, if its factory has run
    pub fn database<T>(&self) -> Option<T>
    where
        T: Clone + 'static,
    {
        let handle: &(dyn Any + Send + Sync) = self.database.client()?.as_ref();
        handle.downcast_ref::<T>().cloned()
    }

    /// The installed cache client, if its factory has run
    pub fn cache(&self) -> Option<Arc<dyn CacheStore>> {
        self.cache.client().cloned()
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Bring the application up and serve until SIGINT or SIGTERM
    ///
    /// With `disable_interrupt_handler` set, signals are left alone and the
    /// server runs until the process exits.
    pub async fn run(
        &mut self,
        runner: Runner,
        configuration: Configuration,
    ) -> Result<(), FrameworkError> {
        let signal: BoxFuture<()> = if configuration.disable_interrupt_handler {
            Box::pin(std::future::pending::<()>())
        } else {
            Box::pin(server::os_signal())
        };
        self.run_until(runner, configuration, signal).await
    }

    /// Same as `run`, with shutdown triggered by `signal`
    ///
    /// Startup order: middleware, clients, prepare hooks, log level, starter
    /// hooks, shutdown registration, serve.
    pub async fn run_until<S>(
        &mut self,
        runner: Runner,
        configuration: Configuration,
        signal: S,
    ) -> Result<(), FrameworkError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        self.start(runner, &configuration, signal).await?.serve().await
    }

    /// `run` for the process-wide application
    ///
    /// The lock on `global()` is only held during startup, so handlers can
    /// read the application while it serves.
    pub async fn run_global(
        runner: Runner,
        configuration: Configuration,
    ) -> Result<(), FrameworkError> {
        let signal: BoxFuture<()> = if configuration.disable_interrupt_handler {
            Box::pin(std::future::pending::<()>())
        } else {
            Box::pin(server::os_signal())
        };
        Self::run_global_until(runner, configuration, signal).await
    }

    /// `run_until` for the process-wide application
    pub async fn run_global_until<S>(
        runner: Runner,
        configuration: Configuration,
        signal: S,
    ) -> Result<(), FrameworkError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let serving = Self::global()
            .lock()
            .await
            .start(runner, &configuration, signal)
            .await?;
        serving.serve().await
    }

    /// Everything `run_until` does before accepting connections
    ///
    /// The returned `Serving` owns what it needs, so `self` is free again.
    pub async fn start<S>(
        &mut self,
        runner: Runner,
        configuration: &Configuration,
        signal: S,
    ) -> Result<Serving, FrameworkError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        self.run_middleware();
        self.run_db().await?;
        self.run_prepares()?;
        self.logger.set_level(configuration.logger_level)?;
        self.run_starters()?;

        let (handle, shutdown_signal) = shutdown::channel();
        let timeout = configuration.shutdown_timeout();
        let mut interrupt = std::mem::take(&mut self.interrupt);
        interrupt.register("server shutdown", move || async move {
            // Already logged; nothing left to unwind into
            let _ = shutdown::shutdown_server(handle, timeout).await;
        });

        Ok(Serving {
            server: self.server.clone(),
            runner,
            signal: shutdown_signal,
            startup_log: !configuration.disable_startup_log,
            watcher: tokio::spawn(interrupt.fire_on(signal)),
        })
    }

    fn run_prepares(&mut self) -> Result<(), FrameworkError> {
        for (name, hook) in std::mem::take(&mut self.prepares) {
            tracing::debug!(hook = %name, "running prepare hook");
            hook(self).map_err(|e| named(&name, e))?;
        }
        Ok(())
    }

    fn run_starters(&mut self) -> Result<(), FrameworkError> {
        for (name, hook) in std::mem::take(&mut self.starters) {
            tracing::debug!(hook = %name, "running starter hook");
            hook(&*self).map_err(|e| named(&name, e))?;
        }
        Ok(())
    }
}

/// A started application waiting to serve
pub struct Serving {
    server: Server,
    runner: Runner,
    signal: ShutdownSignal,
    startup_log: bool,
    watcher: JoinHandle<()>,
}

impl Serving {
    /// Serve until the shutdown signal fires and the drain completes
    pub async fn serve(self) -> Result<(), FrameworkError> {
        let served = self
            .server
            .serve(self.runner, self.signal, self.startup_log)
            .await;

        match served {
            Ok(()) => {
                let _ = self.watcher.await;
                Ok(())
            }
            Err(e) => {
                self.watcher.abort();
                Err(e)
            }
        }
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

fn named(name: &str, error: FrameworkError) -> FrameworkError {
    match error {
        FrameworkError::Hook { .. } => error,
        other => FrameworkError::hook(name, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::database::{self, DatabaseConfig, DbConnection};
    use crate::http::{text, Request, Response};
    use crate::logging::LogLevel;
    use crate::middleware::Next;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    struct Record {
        name: &'static str,
        log: Arc<StdMutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for Record {
        async fn handle(&self, request: Request, next: Next) -> Response {
            self.log.lock().unwrap().push(self.name);
            next(request).await
        }
    }

    async fn home(_req: Request) -> Response {
        text("home")
    }

    fn request(uri: &str) -> Request {
        http::Request::builder()
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    #[test]
    fn test_global_is_shared_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| Application::global() as *const _ as usize))
            .collect();
        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(addrs.iter().all(|addr| *addr == addrs[0]));
        assert!(std::ptr::eq(Application::global(), Application::global()));
    }

    #[tokio::test]
    async fn test_run_db_runs_each_factory_once() {
        let db_calls = Arc::new(AtomicUsize::new(0));
        let cache_calls = Arc::new(AtomicUsize::new(0));
        let mut app = Application::new();

        let calls = db_calls.clone();
        app.install_db(true, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::from("handle"))
        });
        let calls = cache_calls.clone();
        app.install_redis(false, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(MemoryCache::new())
        });

        app.run_db().await.unwrap();
        app.run_db().await.unwrap();

        assert_eq!(db_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache_calls.load(Ordering::SeqCst), 1);
        assert_eq!(app.database::<String>(), Some("handle".to_string()));
        assert_eq!(app.database::<u32>(), None);
        assert_eq!(app.cache().map(|c| c.backend()), Some("memory"));
    }

    #[tokio::test]
    async fn test_missing_installs_leave_handles_unset() {
        let mut app = Application::new();
        app.run_db().await.unwrap();

        assert!(app.database::<DbConnection>().is_none());
        assert!(app.cache().is_none());
    }

    #[tokio::test]
    async fn test_failing_factory_is_reported() {
        let mut app = Application::new();
        app.install_redis(false, || async {
            Err::<MemoryCache, _>(FrameworkError::cache("connection refused"))
        });

        let result = app.run_db().await;
        assert!(matches!(result, Err(FrameworkError::Cache(_))));
        assert!(app.cache().is_none());
    }

    #[tokio::test]
    async fn test_installed_sqlite_database() {
        let mut app = Application::new();
        app.install_db(true, database::installer(DatabaseConfig::new("sqlite::memory:")));
        app.run_db().await.unwrap();

        let conn: DbConnection = app.database().unwrap();
        conn.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_middleware_applied_in_registration_order() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let mut app = Application::new();
        app.routes(Router::new().get("/", home));
        for name in ["first", "second", "third"] {
            app.install_middleware(Record { name, log: log.clone() });
        }

        app.run_middleware();
        app.run_middleware();
        assert_eq!(app.server().middleware().len(), 3);

        let response = app.server().handle(request("/")).await;
        assert_eq!(response.body(), "home");
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_failing_prepare_aborts_run() {
        let mut app = Application::new();
        app.prepare("migrate", |_| Err(FrameworkError::database("no schema")));
        app.starter("never", |_| panic!("starter must not run"));

        let runner = app.create_runner("127.0.0.1:0", vec![]);
        let result = app
            .run_until(runner, Configuration::default(), std::future::pending())
            .await;

        match result {
            Err(FrameworkError::Hook { name, message }) => {
                assert_eq!(name, "migrate");
                assert!(message.contains("no schema"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handlers_read_global_application_while_serving() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        {
            let mut app = Application::global().lock().await;
            app.install_redis(false, || async { Ok(MemoryCache::new()) });
            app.routes(Router::new().get("/", |_req: Request| async {
                let backend = Application::global().lock().await.cache().map(|c| c.backend());
                text(backend.unwrap_or("none"))
            }));
        }

        let (stop, stopped) = oneshot::channel::<()>();
        let configuration = Configuration::default()
            .with_logger_level(LogLevel::Warn)
            .with_shutdown_second(1)
            .with_startup_log(false);
        let running = tokio::spawn(Application::run_global_until(
            Runner::listener(listener),
            configuration,
            async move {
                let _ = stopped.await;
            },
        ));

        let response = tokio::time::timeout(Duration::from_secs(3), async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        })
        .await
        .expect("handler blocked on the global application");
        assert!(response.ends_with("memory"), "{}", response);

        stop.send(()).unwrap();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_until_sequences_startup_and_shutdown() {
        let order = Arc::new(StdMutex::new(Vec::new()));
        let mut app = Application::new();
        app.routes(Router::new().get("/", home));
        app.install_redis(false, || async { Ok(MemoryCache::new()) });

        let log = order.clone();
        app.prepare("prepare", move |app| {
            assert!(app.cache().is_some());
            log.lock().unwrap().push("prepare");
            Ok(())
        });
        let log = order.clone();
        app.starter("starter", move |app| {
            assert_eq!(app.logger().level(), LogLevel::Warn);
            log.lock().unwrap().push("starter");
            Ok(())
        });
        let log = order.clone();
        app.on_interrupt("flush", move || async move {
            log.lock().unwrap().push("interrupt");
        });

        let (stop, stopped) = oneshot::channel::<()>();
        let configuration = Configuration::default()
            .with_logger_level(LogLevel::Warn)
            .with_shutdown_second(1)
            .with_startup_log(false);
        let runner = app.create_runner("127.0.0.1:0", vec![server::runner::keep_alive(false)]);

        let running = tokio::spawn(async move {
            app.run_until(runner, configuration, async move {
                let _ = stopped.await;
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.send(()).unwrap();
        running.await.unwrap().unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["prepare", "starter", "interrupt"]);
    }
}
