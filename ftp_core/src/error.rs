//! Error types for the server, the transfer engine and the client.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::StatusCode;

/// The credential store could not be consulted. Distinct from a rejected
/// credential: this is an operational failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential store {} unavailable: {source}", .path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("path escapes the server root: {0}")]
    InvalidPath(String),

    #[error("transfer I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification that decides how a failed session is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Sockets, listeners, credential store. Session torn down, no reply.
    Operational,
    /// Bad credentials. Replied with 430, then the session closes.
    Authentication,
    /// A data transfer broke. Best-effort 502, then the session closes.
    Transfer,
}

/// Errors that end a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("control connection I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("peer closed the control connection")]
    Disconnected,

    #[error(transparent)]
    CredentialStore(#[from] AuthError),

    #[error("authentication rejected for {identity}")]
    Rejected { identity: String },

    #[error("cannot open data listener on port {port}: {source}")]
    DataListener {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("cannot accept data connection on port {port}: {source}")]
    DataAccept {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Rejected { .. } => ErrorKind::Authentication,
            SessionError::Transfer(_) => ErrorKind::Transfer,
            SessionError::Io(_)
            | SessionError::Disconnected
            | SessionError::CredentialStore(_)
            | SessionError::DataListener { .. }
            | SessionError::DataAccept { .. } => ErrorKind::Operational,
        }
    }

    /// Map a control-stream read failure, treating EOF as a disconnect
    pub(crate) fn from_read(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe => SessionError::Disconnected,
            _ => SessionError::Io(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid username or password")]
    Rejected,

    #[error("unexpected status {0}")]
    Unexpected(StatusCode),

    #[error("unknown status code {0}")]
    UnknownStatus(u32),

    #[error("invalid data port {0}")]
    InvalidPort(u32),

    #[error("transfer aborted by server (final status: {0:?})")]
    TransferAborted(Option<StatusCode>),

    #[error("server closed the control connection")]
    ServerClosed,
}
