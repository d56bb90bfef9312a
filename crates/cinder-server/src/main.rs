use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cinder_server::{Config, Engine, Server};

/// A Redis-compatible in-memory key/value server.
#[derive(Parser)]
#[command(name = "cinder-server", version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(default_value = "redis.conf")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // console plus a daily-rolling file under logs/
    let file_appender = tracing_appender::rolling::daily("logs", "cinder.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "cinder=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    let config = if cli.config.is_file() {
        match Config::load(&cli.config) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %cli.config.display(), "bad configuration: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        info!(path = %cli.config.display(), "no config file, using defaults");
        Config::default()
    };

    let engine = match Engine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(config.addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.addr(), "bind failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("signal received");
            let _ = shutdown_tx.send(());
        }
    });

    Server::new(listener, engine, &config).serve(shutdown_rx).await;
    ExitCode::SUCCESS
}
