use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{filter as tracing_filter, layer::SubscriberExt};

mod app;
mod rpc_server;

use app::App;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
struct Config {
    /// Directory in which to write a JSON log file.
    /// File logging is disabled if unset.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Log level
    #[arg(default_value_t = tracing::Level::INFO, long)]
    log_level: tracing::Level,
    /// URL that the RPC server listens on
    #[arg(default_value = "http://127.0.0.1:7553", long)]
    rpc_url: url::Url,
}

/// Must be held for the lifetime of the program so that the file logger
/// flushes on shutdown.
type LogFileGuard = tracing_appender::non_blocking::WorkerGuard;

fn set_tracing_subscriber(
    log_dir: Option<&Path>,
    log_level: tracing::Level,
) -> anyhow::Result<Option<LogFileGuard>> {
    let targets_filter = tracing_filter::EnvFilter::builder()
        .with_default_directive(
            tracing_filter::LevelFilter::from_level(log_level).into(),
        )
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stdout()))
        .with_file(true)
        .with_line_number(true);

    let (file_layer, log_file_guard) = match log_dir {
        Some(log_dir) => {
            let file_appender =
                tracing_appender::rolling::daily(log_dir, "predmarket.log");
            let (file_writer, guard) =
                tracing_appender::non_blocking(file_appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file_writer);
            (Some(file_layer), Some(guard))
        }
        None => (None, None),
    };

    let tracing_subscriber = tracing_subscriber::registry()
        .with(targets_filter)
        .with(stdout_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(tracing_subscriber)
        .context("setting global default tracing subscriber")?;
    Ok(log_file_guard)
}

/// Logs every state event until the state is dropped.
fn spawn_event_logger(app: &App) {
    let mut events = app.state.read().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(?event, "State event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let _log_file_guard =
        set_tracing_subscriber(config.log_dir.as_deref(), config.log_level)?;

    let app = App::new();
    spawn_event_logger(&app);

    let rpc_addr = rpc_server::run_server(app, config.rpc_url).await?;
    tracing::info!("RPC server listening at {rpc_addr}");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
