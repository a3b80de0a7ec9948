// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Oubliette Worker Daemon (obd)
//!
//! Pulls training job descriptors from the spool and runs each one in a
//! locked-down container, up to the configured concurrency.

use ob_daemon::logging::{
    rotate_log_if_needed, setup_logging, write_startup_error, write_startup_marker,
};
use ob_daemon::{lifecycle, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("obd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("obd {}", env!("CARGO_PKG_VERSION"));
                println!("Oubliette Worker Daemon - runs encrypted training jobs in sandboxed containers");
                println!();
                println!("USAGE:");
                println!("    obd");
                println!();
                println!("Configuration comes from $OB_CONFIG (or <state_dir>/worker.toml)");
                println!("and OB_* environment variables. OB_ENCRYPTION_KEY is required.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: obd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Marker goes in before tracing so operators can find each start attempt.
    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config.log_path)?;
    let log_guard = setup_logging(&config.log_path)?;

    info!(
        state_dir = %config.state_dir.display(),
        concurrency = config.concurrency,
        "starting worker"
    );

    let worker = match lifecycle::startup(&config).await {
        Ok(worker) => worker,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("obd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config.log_path, &e);
            error!("Failed to start worker: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let cancel = worker.pool.cancel_token();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
        cancel.cancel();
    });

    info!(spool = %config.spool_dir.display(), "worker ready");
    println!("READY");

    let stats = worker.pool.run().await;
    info!(
        dispatched = stats.dispatched,
        completed = stats.completed,
        failed = stats.failed,
        "pool drained"
    );

    worker.shutdown()?;
    info!("Worker stopped");
    Ok(())
}
