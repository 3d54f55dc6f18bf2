//! Client half of the protocol.
//!
//! Every data-bearing command follows the same sequence: 120, data port,
//! connect, 125, transfer, 226. A final status other than 226 means the
//! server aborted the transfer and has torn the session down.

use std::io;
use std::net::IpAddr;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::{ClientError, TransferError};
use crate::protocol::{Command, ControlMessage, StatusCode, recv_int32, send_message};
use crate::transfer::{ChunkFraming, receive_file, stream_chunks};

pub struct Client {
    control: TcpStream,
    server_ip: IpAddr,
}

impl Client {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let control = TcpStream::connect(addr).await?;
        let server_ip = control.peer_addr()?.ip();
        debug!("Connected to {}", control.peer_addr()?);
        Ok(Self { control, server_ip })
    }

    /// Submit identity then secret. 430 maps to [`ClientError::Rejected`];
    /// the server closes the connection after it.
    pub async fn login(&mut self, identity: &str, secret: &str) -> Result<(), ClientError> {
        send_message(
            &mut self.control,
            &ControlMessage::new(Command::Account, identity),
        )
        .await?;
        send_message(
            &mut self.control,
            &ControlMessage::new(Command::Password, secret),
        )
        .await?;

        match self.recv_status().await? {
            StatusCode::LoggedIn => Ok(()),
            StatusCode::InvalidCredentials => Err(ClientError::Rejected),
            other => Err(ClientError::Unexpected(other)),
        }
    }

    /// Send one command and return the first status it draws. Data-bearing
    /// commands need the rest of their sequence; use the typed methods.
    pub async fn execute(
        &mut self,
        command: Command,
        argument: &str,
    ) -> Result<StatusCode, ClientError> {
        self.send_raw(&ControlMessage::new(command, argument)).await?;
        self.recv_status().await
    }

    /// Send a message verbatim, including tokens outside the vocabulary
    pub async fn send_raw(&mut self, msg: &ControlMessage) -> Result<(), ClientError> {
        send_message(&mut self.control, msg).await?;
        Ok(())
    }

    /// Fetch the listing of the server's current directory
    pub async fn list(&mut self) -> Result<Vec<u8>, ClientError> {
        let mut data = self.open_data(Command::List, "").await?;
        let mut listing = Vec::new();
        data.read_to_end(&mut listing).await?;
        drop(data);

        self.finish_transfer().await?;
        Ok(listing)
    }

    /// Download `remote` into `local`. A partially written local file is
    /// removed when the server aborts.
    ///
    /// The final status is read even when the local side fails, so the
    /// control stream stays in step with the server.
    pub async fn retrieve(&mut self, remote: &str, local: &Path) -> Result<u64, ClientError> {
        let mut data = self.open_data(Command::Retrieve, remote).await?;
        let received = receive_file(&mut data, local).await;

        let outcome = match received {
            Ok(bytes) => {
                drop(data);
                self.finish_transfer().await.map(|_| bytes)
            }
            Err(e) => {
                // Drain what the server is still sending so it can finish
                let _ = tokio::io::copy(&mut data, &mut tokio::io::sink()).await;
                drop(data);
                Err(self.local_failure(transfer_to_client(e)).await)
            }
        };
        if outcome.is_err() {
            let _ = tokio::fs::remove_file(local).await;
        }
        outcome
    }

    /// Upload `local` as `remote`. The local file is opened and checked
    /// before the command is sent.
    pub async fn store(&mut self, local: &Path, remote: &str) -> Result<u64, ClientError> {
        let mut file = File::open(local).await?;
        if !file.metadata().await?.is_file() {
            return Err(ClientError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", local.display()),
            )));
        }
        let mut data = self.open_data(Command::Store, remote).await?;

        let sent = match stream_chunks(&mut file, &mut data, ChunkFraming::Raw).await {
            Ok(sent) => data.shutdown().await.map(|_| sent),
            Err(e) => Err(e),
        };
        drop(data);

        match sent {
            Ok(sent) => {
                self.finish_transfer().await?;
                Ok(sent)
            }
            Err(e) => Err(self.local_failure(ClientError::Io(e)).await),
        }
    }

    pub async fn create_file(&mut self, path: &str) -> Result<StatusCode, ClientError> {
        self.execute(Command::Append, path).await
    }

    pub async fn delete_file(&mut self, path: &str) -> Result<StatusCode, ClientError> {
        self.execute(Command::Delete, path).await
    }

    pub async fn make_directory(&mut self, path: &str) -> Result<StatusCode, ClientError> {
        self.execute(Command::MakeDir, path).await
    }

    pub async fn remove_directory(&mut self, path: &str) -> Result<StatusCode, ClientError> {
        self.execute(Command::RemoveDir, path).await
    }

    pub async fn change_directory(&mut self, path: &str) -> Result<StatusCode, ClientError> {
        self.execute(Command::ChangeDir, path).await
    }

    pub async fn quit(mut self) -> Result<(), ClientError> {
        match self.execute(Command::Quit, "").await? {
            StatusCode::Closing => Ok(()),
            other => Err(ClientError::Unexpected(other)),
        }
    }

    async fn open_data(&mut self, command: Command, argument: &str) -> Result<TcpStream, ClientError> {
        let status = self.execute(command, argument).await?;
        if status != StatusCode::ServiceReady {
            return Err(ClientError::Unexpected(status));
        }

        let raw_port = recv_int32(&mut self.control).await.map_err(read_error)?;
        let port = u16::try_from(raw_port).map_err(|_| ClientError::InvalidPort(raw_port))?;
        debug!("Data port {} received for {}", port, command);

        let data = TcpStream::connect((self.server_ip, port)).await?;

        match self.recv_status().await? {
            StatusCode::DataOpen => Ok(data),
            other => Err(ClientError::Unexpected(other)),
        }
    }

    /// Settle the final status after a local failure. The server's abort
    /// wins over the local error; a 226 means only our side failed.
    async fn local_failure(&mut self, local: ClientError) -> ClientError {
        match self.finish_transfer().await {
            Err(abort @ ClientError::TransferAborted(_)) => abort,
            _ => local,
        }
    }

    async fn finish_transfer(&mut self) -> Result<(), ClientError> {
        match self.recv_status().await {
            Ok(StatusCode::TransferComplete) => Ok(()),
            Ok(other) => Err(ClientError::TransferAborted(Some(other))),
            Err(ClientError::ServerClosed) => Err(ClientError::TransferAborted(None)),
            Err(e) => Err(e),
        }
    }

    async fn recv_status(&mut self) -> Result<StatusCode, ClientError> {
        let code = recv_int32(&mut self.control).await.map_err(read_error)?;
        StatusCode::try_from(code).map_err(ClientError::UnknownStatus)
    }
}

fn read_error(err: io::Error) -> ClientError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset => ClientError::ServerClosed,
        _ => ClientError::Io(err),
    }
}

fn transfer_to_client(err: TransferError) -> ClientError {
    match err {
        TransferError::Io(e) => ClientError::Io(e),
        other => ClientError::Io(io::Error::other(other.to_string())),
    }
}

/// The command summary shown for `HELP`, which never leaves the client
pub fn help_text() -> String {
    let rows = [
        ("LIST", "return the file list in work directory"),
        ("RETR <file>", "receive a file from server"),
        ("STOR <file>", "send a file to server"),
        ("APPE <path>", "create file on server"),
        ("DELE <path>", "delete file on server"),
        ("MKDR <path>", "make dir on server"),
        ("RMDR <path>", "remove dir on server"),
        ("CWDR <path>", "change working dir"),
        ("HELP", "print help information"),
        ("QUIT", "close the client"),
    ];

    let mut text = String::from("AVAILABLE COMMANDS:\n");
    for (usage, description) in rows {
        text.push_str(&format!("{:<12}: {}\n", usage, description));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_covers_vocabulary() {
        let text = help_text();
        for cmd in Command::ALL {
            if matches!(cmd, Command::Account | Command::Password) {
                continue;
            }
            assert!(text.contains(cmd.as_str()), "help is missing {}", cmd);
        }
    }

    #[test]
    fn test_eof_means_server_closed() {
        let err = read_error(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, ClientError::ServerClosed));
    }
}
