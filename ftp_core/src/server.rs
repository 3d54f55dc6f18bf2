use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rand::Rng;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::ServerEvent;
use crate::auth::CredentialStore;
use crate::config::ServerConfig;
use crate::error::ErrorKind;
use crate::session::{Session, SessionContext};

/// Accepts control connections and runs one isolated task per session
pub struct FtpServer {
    listener: TcpListener,
    ctx: Arc<SessionContext>,
}

impl FtpServer {
    /// Validate the config, check the root directory and bind the control
    /// listener
    pub async fn bind(config: ServerConfig, event_tx: mpsc::Sender<ServerEvent>) -> Result<Self> {
        config.validate()?;

        let root = tokio::fs::canonicalize(&config.root_dir)
            .await
            .with_context(|| {
                format!("Server root {} is unavailable", config.root_dir.display())
            })?;
        if !tokio::fs::metadata(&root).await?.is_dir() {
            bail!("Server root {} is not a directory", root.display());
        }

        let addr = SocketAddr::new(config.bind_addr, config.control_port);
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind control port {}", addr))?;

        info!(
            "Control listener on {}, root {}, data ports [{}, {})",
            listener.local_addr()?,
            root.display(),
            config.data_ports.floor,
            config.data_ports.ceil
        );

        let ctx = SessionContext {
            root,
            store: CredentialStore::new(config.accounts_file, config.anonymous_identity),
            data_ports: config.data_ports,
            framing: config.framing,
            event_tx,
        };

        Ok(Self {
            listener,
            ctx: Arc::new(ctx),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` is cancelled. Sessions still in
    /// progress at that point are aborted and their connections closed
    /// before this returns.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(
                        "Shutdown requested, closing {} active session(s)",
                        sessions.len()
                    );
                    break;
                }
                // Reap finished sessions
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let ctx = self.ctx.clone();
                        let seed: u64 = rand::rng().random();

                        sessions.spawn(async move {
                            let session = Session::new(stream, peer, ctx, seed);
                            let id = session.id();
                            if let Err(e) = session.run().await {
                                match e.kind() {
                                    ErrorKind::Authentication => {
                                        warn!("[{}] Session with {} ended: {}", id, peer, e)
                                    }
                                    ErrorKind::Operational | ErrorKind::Transfer => {
                                        error!("[{}] Session with {} failed: {}", id, peer, e)
                                    }
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept control connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }

        sessions.shutdown().await;
    }
}
