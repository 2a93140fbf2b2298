use crate::config::ServerConfig;
use crate::error::FrameworkError;
use hyper::server::conn::http1;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// hyper rejects read buffers smaller than this
const MIN_BUF_SIZE: usize = 8192;

/// Per-connection HTTP/1 settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub keep_alive: bool,
    pub half_close: bool,
    pub max_buf_size: Option<usize>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            half_close: false,
            max_buf_size: None,
        }
    }
}

impl HostConfig {
    pub(crate) fn builder(&self) -> http1::Builder {
        let mut builder = http1::Builder::new();
        builder.keep_alive(self.keep_alive).half_close(self.half_close);
        if let Some(size) = self.max_buf_size {
            builder.max_buf_size(size.max(MIN_BUF_SIZE));
        }
        builder
    }
}

/// Adjusts a `HostConfig` when a runner is created
pub type HostConfigurator = Box<dyn FnOnce(&mut HostConfig) + Send>;

pub fn keep_alive(enabled: bool) -> HostConfigurator {
    Box::new(move |config: &mut HostConfig| config.keep_alive = enabled)
}

pub fn half_close(enabled: bool) -> HostConfigurator {
    Box::new(move |config: &mut HostConfig| config.half_close = enabled)
}

pub fn max_buf_size(size: usize) -> HostConfigurator {
    Box::new(move |config: &mut HostConfig| config.max_buf_size = Some(size))
}

enum Bind {
    Addr(String),
    Listener(TcpListener),
}

/// Where and how the server listens
///
/// # Example
///
/// ```rust,ignore
/// let runner = Runner::addr("0.0.0.0:8080").configure(|host| host.keep_alive = false);
/// ```
pub struct Runner {
    bind: Bind,
    host: HostConfig,
}

impl Runner {
    /// Bind `addr` when the server starts
    pub fn addr(addr: impl Into<String>) -> Self {
        Self {
            bind: Bind::Addr(addr.into()),
            host: HostConfig::default(),
        }
    }

    /// Serve on a listener that is already bound
    pub fn listener(listener: TcpListener) -> Self {
        Self {
            bind: Bind::Listener(listener),
            host: HostConfig::default(),
        }
    }

    /// Address from `SERVER_HOST` / `SERVER_PORT`
    pub fn from_env() -> Self {
        Self::addr(ServerConfig::from_env().addr())
    }

    pub fn configure(mut self, f: impl FnOnce(&mut HostConfig)) -> Self {
        f(&mut self.host);
        self
    }

    pub fn with(self, configurators: impl IntoIterator<Item = HostConfigurator>) -> Self {
        configurators
            .into_iter()
            .fold(self, |runner, configurator| runner.configure(configurator))
    }

    pub fn host_config(&self) -> &HostConfig {
        &self.host
    }

    pub(crate) async fn bind(self) -> Result<(TcpListener, SocketAddr, HostConfig), FrameworkError> {
        let listener = match self.bind {
            Bind::Listener(listener) => listener,
            Bind::Addr(addr) => TcpListener::bind(addr.as_str())
                .await
                .map_err(|e| FrameworkError::Io(format!("failed to bind {}: {}", addr, e)))?,
        };
        let local = listener.local_addr()?;
        Ok((listener, local, self.host))
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bind = match &self.bind {
            Bind::Addr(addr) => addr.clone(),
            Bind::Listener(listener) => listener
                .local_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "<listener>".to_string()),
        };
        f.debug_struct("Runner")
            .field("bind", &bind)
            .field("host", &self.host)
            .finish()
    }
}
