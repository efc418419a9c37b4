#![forbid(unsafe_code)]

//! `fpm-supervisor` — run one php-fpm worker in the foreground.
//!
//! Renders the worker config, starts php-fpm, waits for it to accept
//! connections, forwards its output to the log, and stops it gracefully on
//! Ctrl-C or SIGTERM.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fpm_supervisor::fpm::output::{forward_output, join_forwarder};
use fpm_supervisor::{AppError, FpmProcess, Result, SupervisorConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "fpm-supervisor", about = "Run a php-fpm worker in the foreground", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the listen specification (`host:port`, `port`, or a socket path).
    #[arg(long)]
    listen: Option<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("fpm-supervisor bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = SupervisorConfig::load_from_path(&args.config)?;
    if let Some(listen) = args.listen.filter(|l| !l.is_empty()) {
        config.listen = Some(listen);
    }
    info!(
        executable = %config.executable.display(),
        data_dir = %config.data_dir.display(),
        "configuration loaded"
    );

    // ── Render worker config ────────────────────────────
    let mut process = FpmProcess::from_config(&config);
    process.save_config(config.config_file_path())?;

    // ── Start worker ────────────────────────────────────
    let (stdout, stderr) = match process.start().await {
        Ok(streams) => streams,
        Err(err @ AppError::Timeout(_)) => {
            // The library leaves a slow worker running; the binary owns it
            // and must not orphan it.
            error!(%err, "php-fpm did not become ready; stopping it");
            if let Err(stop_err) = process.stop() {
                warn!(%stop_err, "failed to stop unready worker");
            } else if let Err(wait_err) = process.wait().await {
                warn!(%wait_err, "failed to reap unready worker");
            }
            return Err(err);
        }
        Err(err) => return Err(err),
    };

    let ct = CancellationToken::new();
    let stdout_handle = tokio::spawn(forward_output(stdout, "stdout", ct.clone()));
    let stderr_handle = tokio::spawn(forward_output(stderr, "stderr", ct.clone()));

    info!(pid = process.pid(), "php-fpm supervised; waiting for shutdown signal");

    // ── Wait for shutdown or worker exit ────────────────
    let exited = tokio::select! {
        () = shutdown_signal() => None,
        result = process.wait() => Some(result),
    };

    let status = if let Some(result) = exited {
        warn!("php-fpm exited before a shutdown signal");
        result?
    } else {
        info!("shutdown signal received");
        process.stop()?;
        process.wait().await?
    };

    // ── Drain output forwarders ─────────────────────────
    // The pipes close with the worker; cancellation covers grandchildren
    // that inherited them.
    ct.cancel();
    let (stdout_lines, stderr_lines) = tokio::join!(
        join_forwarder("stdout", stdout_handle),
        join_forwarder("stderr", stderr_handle)
    );

    info!(?stdout_lines, ?stderr_lines, %status, "fpm-supervisor shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
