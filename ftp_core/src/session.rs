//! Per-connection control session.
//!
//! A session walks `Unauthenticated -> Idle <-> DataTransferInFlight ->
//! Closed`. Every stage returns a `Result`: recoverable protocol problems
//! are answered with 502 inside the handler and the loop continues, while
//! a [`SessionError`] ends the session and its kind decides whether a final
//! reply is attempted.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ServerEvent;
use crate::auth::{AuthOutcome, Credential, CredentialStore};
use crate::error::{ErrorKind, SessionError, TransferError};
use crate::port::{PortNegotiator, PortRange};
use crate::protocol::{Command, ControlMessage, StatusCode, recv_message, send_port, send_status};
use crate::transfer::{
    ChunkFraming, display_virtual, receive_file, resolve_virtual, send_file, send_listing,
};

/// Read-only state shared by every session of one server
#[derive(Debug)]
pub struct SessionContext {
    /// Canonical server root
    pub root: PathBuf,
    pub store: CredentialStore,
    pub data_ports: PortRange,
    pub framing: ChunkFraming,
    pub event_tx: mpsc::Sender<ServerEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unauthenticated,
    Idle,
    DataTransferInFlight,
    Closed,
}

/// What the control loop does after a command
enum Flow {
    Continue,
    Close,
}

/// A data-bearing command with its argument
enum Transfer {
    List,
    Retrieve(String),
    Store(String),
}

impl Transfer {
    fn command(&self) -> Command {
        match self {
            Transfer::List => Command::List,
            Transfer::Retrieve(_) => Command::Retrieve,
            Transfer::Store(_) => Command::Store,
        }
    }

    fn argument(&self) -> &str {
        match self {
            Transfer::List => "",
            Transfer::Retrieve(arg) | Transfer::Store(arg) => arg,
        }
    }
}

pub struct Session {
    id: Uuid,
    peer: SocketAddr,
    control: TcpStream,
    ctx: Arc<SessionContext>,
    state: SessionState,
    identity: Option<String>,
    ports: PortNegotiator,
    /// Working directory relative to the root
    cwd: PathBuf,
}

impl Session {
    /// Create a session for an accepted control connection. `seed` feeds the
    /// session's own generator, which picks the first data port.
    pub fn new(control: TcpStream, peer: SocketAddr, ctx: Arc<SessionContext>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let ports = PortNegotiator::new(ctx.data_ports, &mut rng);
        Self {
            id: Uuid::new_v4(),
            peer,
            control,
            ctx,
            state: SessionState::Unauthenticated,
            identity: None,
            ports,
            cwd: PathBuf::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Drive the session to completion. The control connection is closed
    /// on return whatever the outcome.
    pub async fn run(mut self) -> Result<(), SessionError> {
        info!("[{}] Session started with {}", self.id, self.peer);
        self.emit(ServerEvent::SessionStarted {
            session_id: self.id,
            peer: self.peer,
        });

        let result = self.drive().await;

        if let Err(e) = &result {
            if e.kind() == ErrorKind::Transfer {
                // The peer may already be gone
                let _ = send_status(&mut self.control, StatusCode::NotImplemented).await;
            }
        }

        self.state = SessionState::Closed;
        let _ = self.control.shutdown().await;
        info!("[{}] Session with {} closed", self.id, self.peer);
        self.emit(ServerEvent::SessionClosed {
            session_id: self.id,
        });

        match result {
            // A peer hanging up between commands is a normal ending
            Err(SessionError::Disconnected) if self.identity.is_some() => Ok(()),
            other => other,
        }
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        self.login().await?;

        loop {
            let msg = self.recv().await?;
            debug!(
                "[{}] {:?}: received {}",
                self.id,
                self.state,
                String::from_utf8_lossy(msg.token())
            );
            match self.dispatch(msg).await? {
                Flow::Continue => {}
                Flow::Close => return Ok(()),
            }
        }
    }

    async fn login(&mut self) -> Result<(), SessionError> {
        loop {
            let identity_msg = self.recv().await?;
            let secret_msg = self.recv().await?;

            if identity_msg.command() != Some(Command::Account)
                || secret_msg.command() != Some(Command::Password)
            {
                warn!("[{}] Malformed credential exchange from {}", self.id, self.peer);
                self.reply(StatusCode::NotImplemented).await?;
                continue;
            }

            let credential = Credential::new(
                identity_msg.argument().trim(),
                secret_msg.argument().trim(),
            );

            match self.ctx.store.authenticate(&credential).await? {
                AuthOutcome::Authenticated => {
                    self.reply(StatusCode::LoggedIn).await?;
                    self.state = SessionState::Idle;
                    self.emit(ServerEvent::Authenticated {
                        session_id: self.id,
                        identity: credential.identity.clone(),
                    });
                    self.identity = Some(credential.identity);
                    return Ok(());
                }
                AuthOutcome::Rejected => {
                    self.reply(StatusCode::InvalidCredentials).await?;
                    self.emit(ServerEvent::AuthenticationFailed {
                        session_id: self.id,
                        identity: credential.identity.clone(),
                    });
                    return Err(SessionError::Rejected {
                        identity: credential.identity,
                    });
                }
            }
        }
    }

    async fn dispatch(&mut self, msg: ControlMessage) -> Result<Flow, SessionError> {
        let argument = msg.argument().trim().to_string();

        match msg.command() {
            Some(Command::List) => self.data_command(Transfer::List).await?,
            Some(Command::Retrieve) => self.data_command(Transfer::Retrieve(argument)).await?,
            Some(Command::Store) => self.data_command(Transfer::Store(argument)).await?,
            Some(
                cmd @ (Command::Append
                | Command::Delete
                | Command::MakeDir
                | Command::RemoveDir
                | Command::ChangeDir),
            ) => {
                let status = match self.apply_filesystem(cmd, &argument).await {
                    Ok(()) => StatusCode::ServiceReady,
                    Err(e) => {
                        warn!("[{}] {} {:?} failed: {}", self.id, cmd, argument, e);
                        StatusCode::NotImplemented
                    }
                };
                self.reply(status).await?;
            }
            Some(Command::Quit) => {
                self.reply(StatusCode::Closing).await?;
                return Ok(Flow::Close);
            }
            Some(Command::Account | Command::Password | Command::Help) | None => {
                debug!(
                    "[{}] Unsupported command {:?}",
                    self.id,
                    String::from_utf8_lossy(msg.token())
                );
                self.reply(StatusCode::NotImplemented).await?;
            }
        }

        Ok(Flow::Continue)
    }

    /// 120, port, accept, 125, transfer, 226. The data connection and its
    /// listener never outlive this call.
    async fn data_command(&mut self, transfer: Transfer) -> Result<(), SessionError> {
        let command = transfer.command();
        self.reply(StatusCode::ServiceReady).await?;

        let port = self.ports.next_port();
        let bind_addr = SocketAddr::new(self.control.local_addr()?.ip(), port);
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| SessionError::DataListener { port, source })?;

        send_port(&mut self.control, port).await?;
        debug!("[{}] Data port {} sent", self.id, port);
        self.emit(ServerEvent::DataPortOpened {
            session_id: self.id,
            port,
        });

        let (mut data, data_peer) = listener
            .accept()
            .await
            .map_err(|source| SessionError::DataAccept { port, source })?;
        debug!("[{}] Data connection from {}", self.id, data_peer);

        self.state = SessionState::DataTransferInFlight;
        self.reply(StatusCode::DataOpen).await?;

        let result = self.run_transfer(&transfer, &mut data).await;
        drop(data);
        drop(listener);
        self.state = SessionState::Idle;

        match result {
            Ok(bytes) => {
                self.reply(StatusCode::TransferComplete).await?;
                info!(
                    "[{}] {} {} complete: {} bytes",
                    self.id,
                    command,
                    transfer.argument(),
                    bytes
                );
                self.emit(ServerEvent::TransferCompleted {
                    session_id: self.id,
                    command,
                    path: transfer.argument().to_string(),
                    bytes,
                });
                Ok(())
            }
            Err(e) => {
                self.emit(ServerEvent::TransferFailed {
                    session_id: self.id,
                    command,
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    async fn run_transfer(
        &self,
        transfer: &Transfer,
        data: &mut TcpStream,
    ) -> Result<u64, TransferError> {
        match transfer {
            Transfer::List => {
                send_listing(data, &self.ctx.root.join(&self.cwd), self.ctx.framing).await
            }
            Transfer::Retrieve(arg) => {
                let path = self.transfer_path(arg)?;
                send_file(data, &path, self.ctx.framing).await
            }
            Transfer::Store(arg) => {
                let path = self.transfer_path(arg)?;
                receive_file(data, &path).await
            }
        }
    }

    fn transfer_path(&self, arg: &str) -> Result<PathBuf, TransferError> {
        if arg.is_empty() {
            return Err(TransferError::InvalidPath("missing file name".to_string()));
        }
        resolve_virtual(&self.cwd, arg)
            .map(|virtual_path| self.ctx.root.join(virtual_path))
            .ok_or_else(|| TransferError::InvalidPath(arg.to_string()))
    }

    /// Apply one local filesystem mutation. Any error becomes a 502.
    async fn apply_filesystem(&mut self, cmd: Command, argument: &str) -> anyhow::Result<()> {
        if argument.is_empty() {
            bail!("missing argument");
        }
        let removing = matches!(cmd, Command::Delete | Command::RemoveDir);
        if removing && argument.starts_with('.') {
            bail!("refusing to remove dot-prefixed {}", argument);
        }

        let virtual_path = resolve_virtual(&self.cwd, argument)
            .ok_or_else(|| anyhow!("{} escapes the server root", argument))?;
        // The root is the empty path, so it is covered too
        if removing && self.cwd.starts_with(&virtual_path) {
            bail!(
                "refusing to remove {}, the working directory or a parent of it",
                display_virtual(&virtual_path)
            );
        }
        let path = self.ctx.root.join(&virtual_path);

        match cmd {
            Command::Append => {
                tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await?;
            }
            Command::Delete => tokio::fs::remove_file(&path).await?,
            Command::MakeDir => tokio::fs::create_dir(&path).await?,
            Command::RemoveDir => tokio::fs::remove_dir(&path).await?,
            Command::ChangeDir => {
                self.enter_directory(&path).await?;
                self.cwd = virtual_path.clone();
            }
            other => bail!("{} is not a filesystem command", other),
        }

        info!("[{}] {} {} done", self.id, cmd, display_virtual(&virtual_path));
        Ok(())
    }

    /// The target must be a directory that really lives under the root
    async fn enter_directory(&self, path: &Path) -> anyhow::Result<()> {
        let canonical = tokio::fs::canonicalize(path).await?;
        if !canonical.starts_with(&self.ctx.root) {
            bail!("{} resolves outside the server root", path.display());
        }
        if !tokio::fs::metadata(&canonical).await?.is_dir() {
            bail!("{} is not a directory", path.display());
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<ControlMessage, SessionError> {
        recv_message(&mut self.control)
            .await
            .map_err(SessionError::from_read)
    }

    async fn reply(&mut self, status: StatusCode) -> Result<(), SessionError> {
        send_status(&mut self.control, status).await?;
        debug!("[{}] Code {} sent", self.id, status.code());
        Ok(())
    }

    /// Best effort: a full or closed observer channel never stalls a session
    fn emit(&self, event: ServerEvent) {
        let _ = self.ctx.event_tx.try_send(event);
    }
}
