// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreman orchestrator binary.
//!
//! `foreman serve` starts the long-running HTTP RPC server; `foreman
//! stdio` acts as a one-off stdio RPC endpoint for a single child. Both
//! modes own a full orchestrator with a running supervisor.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use foreman_adapters::TmuxPaneAdapter;
use foreman_core::{SystemClock, UuidIdGen};
use foreman_daemon::RpcState;
use foreman_engine::{spawn_supervisor, Config, Orchestrator};
use std::path::Path;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

type ProdOrchestrator = Orchestrator<TmuxPaneAdapter, SystemClock, UuidIdGen>;

/// Parsed command line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Serve,
    Stdio,
    Version,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        Some("serve") => Ok(Command::Serve),
        Some("stdio") => Ok(Command::Stdio),
        Some("--version" | "-V" | "-v") => Ok(Command::Version),
        Some("--help" | "-h" | "help") => Ok(Command::Help),
        Some(other) => Err(format!("unexpected argument '{}'", other)),
        None => Err("missing command".to_string()),
    }
}

fn print_help() {
    println!("foreman {}", env!("CARGO_PKG_VERSION"));
    println!("Orchestrator for a network of coding-assistant CLI instances");
    println!();
    println!("USAGE:");
    println!("    foreman serve    Start the long-running HTTP RPC server");
    println!("    foreman stdio    Serve RPC frames on stdin/stdout");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -V, --version    Print version information");
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {}", message);
            eprintln!("Usage: foreman <serve|stdio> [--help | --version]");
            std::process::exit(1);
        }
    };

    match command {
        Command::Version => {
            println!("foreman {}", env!("CARGO_PKG_VERSION"));
        }
        Command::Help => print_help(),
        Command::Serve => {
            if let Err(code) = serve_main().await {
                std::process::exit(code);
            }
        }
        Command::Stdio => {
            if let Err(code) = stdio_main().await {
                std::process::exit(code);
            }
        }
    }
}

/// Start the orchestrator, or report the fatal condition and return the
/// process exit code.
async fn start_orchestrator() -> Result<(Config, Arc<ProdOrchestrator>), i32> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: configuration: {}", e);
            return Err(2);
        }
    };

    rotate_log_if_needed(&config.log_root.join("orchestrator.log"));
    let _log_guard = match setup_logging(&config) {
        Ok(guard) => Box::leak(Box::new(guard)),
        Err(e) => {
            eprintln!("error: log setup: {}", e);
            return Err(2);
        }
    };

    let orch = match Orchestrator::start(
        config.clone(),
        TmuxPaneAdapter::new(),
        SystemClock,
        UuidIdGen,
    )
    .await
    {
        Ok(orch) => orch,
        Err(e) => {
            error!("failed to start orchestrator: {}", e);
            eprintln!("error: {}", e);
            return Err(2);
        }
    };

    Ok((config, orch))
}

async fn serve_main() -> Result<(), i32> {
    let (config, orch) = start_orchestrator().await?;
    info!("starting foreman rpc server");

    let supervisor = spawn_supervisor(Arc::clone(&orch));
    let state = Arc::new(RpcState::new(Arc::clone(&orch)));
    let shutdown = CancellationToken::new();

    let server = tokio::spawn(foreman_daemon::http::serve(
        Arc::clone(&state),
        config.rpc_port,
        shutdown.clone(),
    ));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");
    shutdown.cancel();

    // Terminate children first so outputs and artifacts are preserved
    orch.shutdown_all().await;
    supervisor.abort();

    match server.await {
        Ok(Ok(())) => {
            info!("foreman stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("rpc server failed: {}", e);
            Err(1)
        }
        Err(e) => {
            error!("rpc server task failed: {}", e);
            Err(1)
        }
    }
}

async fn stdio_main() -> Result<(), i32> {
    let (_config, orch) = start_orchestrator().await?;
    info!("starting foreman stdio endpoint");

    let supervisor = spawn_supervisor(Arc::clone(&orch));
    let state = Arc::new(RpcState::new(Arc::clone(&orch)));

    let result =
        foreman_daemon::stdio::run(state, tokio::io::stdin(), tokio::io::stdout()).await;

    orch.shutdown_all().await;
    supervisor.abort();

    match result {
        Ok(()) => {
            info!("foreman stdio endpoint closed");
            Ok(())
        }
        Err(e) => {
            error!("stdio transport failed: {}", e);
            Err(1)
        }
    }
}

async fn wait_for_shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("signal handler setup failed: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("signal handler setup failed: {}", e);
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
}

/// Maximum orchestrator log size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 5;

/// Rotate the orchestrator log if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `orchestrator.log` -> `.1` -> ... -> `.5`, deleting the oldest.
/// Best-effort: rotation failures are silently ignored so the
/// orchestrator still starts.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    // Shift older rotations: .5 is deleted, .4 -> .5, ...
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(&config.log_root)?;

    let file_appender =
        tracing_appender::rolling::never(&config.log_root, "orchestrator.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
