//! Control server entry point
//!
//! Run with: cargo run --bin ftp-server -- --root ./ser --port 2121

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ftp_core::{FtpServer, ServerConfig, ServerEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ftp-server")]
#[command(about = "Minimal file transfer server")]
struct Args {
    /// JSON config file (defaults to the per-user config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control port
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory served to clients
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Credential store, one `identity secret` pair per line
    #[arg(short, long)]
    accounts: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<IpAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load_from(path)?,
        None => ServerConfig::load(),
    };
    if let Some(port) = args.port {
        config.control_port = port;
    }
    if let Some(root) = args.root {
        config.root_dir = root;
    }
    if let Some(accounts) = args.accounts {
        config.accounts_file = accounts;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let (event_tx, mut event_rx) = mpsc::channel(256);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            log_event(&event);
        }
    });

    let server = FtpServer::bind(config, event_tx).await?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received"),
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
        signal_token.cancel();
    });

    server.run(shutdown).await;
    Ok(())
}

fn log_event(event: &ServerEvent) {
    match event {
        ServerEvent::SessionStarted { session_id, peer } => {
            info!("[{}] connected from {}", session_id, peer)
        }
        ServerEvent::Authenticated {
            session_id,
            identity,
        } => info!("[{}] logged in as {}", session_id, identity),
        ServerEvent::AuthenticationFailed {
            session_id,
            identity,
        } => warn!("[{}] rejected login for {}", session_id, identity),
        ServerEvent::DataPortOpened { .. } => {}
        ServerEvent::TransferCompleted {
            session_id,
            command,
            path,
            bytes,
        } => info!("[{}] {} {} ({} bytes)", session_id, command, path, bytes),
        ServerEvent::TransferFailed {
            session_id,
            command,
            message,
        } => warn!("[{}] {} failed: {}", session_id, command, message),
        ServerEvent::SessionClosed { session_id } => info!("[{}] disconnected", session_id),
    }
}
