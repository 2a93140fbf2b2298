use clap::Parser;
use ignition::config::{AppConfig, Config, ServerConfig};
use ignition::server::runner;
use ignition::{Application, FrameworkError};
use std::path::{Path, PathBuf};

mod bootstrap;
mod config;
mod controllers;
mod middleware;
mod routes;
mod state;

#[derive(Parser)]
#[command(name = "app")]
#[command(about = "Ignition demo service")]
struct Cli {
    /// Address to listen on (defaults to SERVER_HOST:SERVER_PORT)
    #[arg(long)]
    addr: Option<String>,

    /// JSON file with run options (defaults to LOGGER_LEVEL, SHUTDOWN_SECOND, ...)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), FrameworkError> {
    let cli = Cli::parse();

    // Creating the application installs the log subscriber
    let mut app = Application::new();

    let environment = Config::init(Path::new("."));
    let configuration = config::load(cli.config.as_deref())?;
    let app_config = AppConfig::from_env();
    bootstrap::register(&mut app, &app_config);

    let addr = cli
        .addr
        .unwrap_or_else(|| ServerConfig::from_env().addr());
    let runner = app.create_runner(addr, vec![runner::keep_alive(true)]);

    tracing::info!(app = %app_config.name, %environment, "starting");
    app.run(runner, configuration).await
}
