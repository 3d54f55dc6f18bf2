use std::net::SocketAddr;
use uuid::Uuid;

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod port;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transfer;

pub use auth::{AuthOutcome, Credential, CredentialStore};
pub use client::Client;
pub use config::ServerConfig;
pub use error::{AuthError, ClientError, ErrorKind, SessionError, TransferError};
pub use port::{PortNegotiator, PortRange, next_port};
pub use protocol::{Command, ControlMessage, StatusCode};
pub use server::FtpServer;
pub use session::Session;

/// Session lifecycle report from the server to whoever is watching
#[derive(Debug, Clone)]
pub enum ServerEvent {
    SessionStarted {
        session_id: Uuid,
        peer: SocketAddr,
    },

    Authenticated {
        session_id: Uuid,
        identity: String,
    },

    AuthenticationFailed {
        session_id: Uuid,
        identity: String,
    },

    /// A data listener is up and its port was sent to the peer
    DataPortOpened {
        session_id: Uuid,
        port: u16,
    },

    TransferCompleted {
        session_id: Uuid,
        command: Command,
        path: String,
        bytes: u64,
    },

    TransferFailed {
        session_id: Uuid,
        command: Command,
        message: String,
    },

    SessionClosed {
        session_id: Uuid,
    },
}
