//! matchday - bootstrap and inspect the club app's offline cache.
//!
//! Opens the persistent cache (flushing it if the app version changed),
//! then preloads the start-up resources or runs an inspection command.

mod commands;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Command, USAGE};
use matchday_core::{CacheContext, Config, FileStore, NetworkStatus};

/// Directory for rolling log files; logs go to stderr only when unset
const LOG_DIR_ENV: &str = "MATCHDAY_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=matchday_core=debug).
/// The returned guard must live until exit so file logs are flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "matchday.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load()?.with_env();
    if args.iter().any(|a| a == "--offline") {
        config.offline = true;
    }

    let storage_path = config.storage_path()?;
    let store = FileStore::open(&storage_path)
        .await
        .with_context(|| format!("Failed to open cache storage at {}", storage_path.display()))?;

    // Version check runs inside open(), before any other cache read
    let ctx = CacheContext::builder(Arc::new(store))
        .connectivity(Arc::new(NetworkStatus::new(!config.offline)))
        .app_version(config.app_version())
        .open()
        .await;
    if ctx.flushed_on_open() {
        println!("App version changed to {} - cache cleared", ctx.app_version());
    }

    info!(?command, "Running command");
    match command {
        Command::Preload { force } => commands::preload(&ctx, &config, force).await,
        Command::Inspect => commands::inspect(&ctx, &config).await,
        Command::Invalidate(patterns) => commands::invalidate(&ctx, &patterns).await,
        Command::Clear => commands::clear(&ctx).await,
        Command::Help => Ok(()),
    }
}
