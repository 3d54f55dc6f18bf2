//! Fixed-width control message codec.
//!
//! A control message is exactly [`MESSAGE_SIZE`] bytes: a 4-byte command
//! token, one NUL separator, then the argument, NUL-padded to the end of the
//! buffer. There is no other framing. Status codes and data ports travel as
//! 4-byte big-endian integers.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::command::Command;
use super::constants::{ARG_OFFSET, MAX_ARG_LEN, MESSAGE_SIZE, TOKEN_LEN};
use super::status::StatusCode;

/// One fixed-width command record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    token: [u8; TOKEN_LEN],
    argument: String,
}

impl ControlMessage {
    pub fn new(command: Command, argument: &str) -> Self {
        Self::with_token(*command.token(), argument)
    }

    /// Build a message from an arbitrary token. The argument is cut at the
    /// first NUL and truncated to [`MAX_ARG_LEN`] bytes on a char boundary.
    pub fn with_token(token: [u8; TOKEN_LEN], argument: &str) -> Self {
        let argument = argument.split('\0').next().unwrap_or_default();
        let mut cutoff = argument.len().min(MAX_ARG_LEN);
        while !argument.is_char_boundary(cutoff) {
            cutoff -= 1;
        }
        Self {
            token,
            argument: argument[..cutoff].to_string(),
        }
    }

    pub fn token(&self) -> &[u8; TOKEN_LEN] {
        &self.token
    }

    /// The command this token names, if it is part of the vocabulary
    pub fn command(&self) -> Option<Command> {
        Command::from_token(&self.token)
    }

    pub fn argument(&self) -> &str {
        &self.argument
    }

    pub fn encode(&self) -> [u8; MESSAGE_SIZE] {
        encode(&self.token, &self.argument)
    }

    pub fn decode(buf: &[u8; MESSAGE_SIZE]) -> Self {
        let (token, argument) = decode(buf);
        Self { token, argument }
    }
}

/// Encode a token and argument into one fixed-width buffer
pub fn encode(token: &[u8; TOKEN_LEN], argument: &str) -> [u8; MESSAGE_SIZE] {
    let mut buf = [0u8; MESSAGE_SIZE];
    buf[..TOKEN_LEN].copy_from_slice(token);

    let arg = argument.as_bytes();
    let len = arg.len().min(MAX_ARG_LEN);
    buf[ARG_OFFSET..ARG_OFFSET + len].copy_from_slice(&arg[..len]);
    buf
}

/// Split a fixed-width buffer into token and argument.
///
/// Never fails: the width guarantees a complete frame. Whether the token
/// means anything is for the caller to judge. A single NUL separator after
/// the token is skipped, and the argument ends at the next NUL.
pub fn decode(buf: &[u8; MESSAGE_SIZE]) -> ([u8; TOKEN_LEN], String) {
    let mut token = [0u8; TOKEN_LEN];
    token.copy_from_slice(&buf[..TOKEN_LEN]);

    let mut region = &buf[TOKEN_LEN..];
    if region.first() == Some(&0) {
        region = &region[1..];
    }
    let end = region.iter().position(|&b| b == 0).unwrap_or(region.len());
    let argument = String::from_utf8_lossy(&region[..end]).into_owned();

    (token, argument)
}

pub fn encode_int32(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn decode_int32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// Write one control message
pub async fn send_message<W>(stream: &mut W, msg: &ControlMessage) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(&msg.encode()).await?;
    stream.flush().await
}

/// Read exactly one control message. A peer that closes mid-frame yields
/// `UnexpectedEof`.
pub async fn recv_message<R>(stream: &mut R) -> io::Result<ControlMessage>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; MESSAGE_SIZE];
    stream.read_exact(&mut buf).await?;
    Ok(ControlMessage::decode(&buf))
}

pub async fn send_status<W>(stream: &mut W, status: StatusCode) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    send_int32(stream, status.code()).await
}

pub async fn send_port<W>(stream: &mut W, port: u16) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    send_int32(stream, u32::from(port)).await
}

pub async fn send_int32<W>(stream: &mut W, value: u32) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(&encode_int32(value)).await?;
    stream.flush().await
}

pub async fn recv_int32<R>(stream: &mut R) -> io::Result<u32>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await?;
    Ok(decode_int32(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let msg = ControlMessage::new(Command::Retrieve, "notes/today.txt");
        let decoded = ControlMessage::decode(&msg.encode());
        assert_eq!(decoded, msg);
        assert_eq!(decoded.command(), Some(Command::Retrieve));
        assert_eq!(decoded.argument(), "notes/today.txt");
    }

    #[test]
    fn test_layout_matches_wire_format() {
        let buf = encode(b"ACCT", "bob");
        assert_eq!(&buf[..4], b"ACCT");
        assert_eq!(buf[4], 0);
        assert_eq!(&buf[5..8], b"bob");
        assert!(buf[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_argument() {
        let msg = ControlMessage::new(Command::List, "");
        let decoded = ControlMessage::decode(&msg.encode());
        assert_eq!(decoded.argument(), "");
        assert_eq!(decoded.command(), Some(Command::List));
    }

    #[test]
    fn test_long_argument_truncated() {
        let long = "x".repeat(MESSAGE_SIZE * 2);
        let msg = ControlMessage::new(Command::Store, &long);
        assert_eq!(msg.argument().len(), MAX_ARG_LEN);
        assert_eq!(ControlMessage::decode(&msg.encode()), msg);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // 🦀 is 4 bytes, MAX_ARG_LEN is not a multiple of 4
        let crabs = "🦀".repeat(MAX_ARG_LEN);
        let msg = ControlMessage::new(Command::Store, &crabs);
        assert!(msg.argument().len() <= MAX_ARG_LEN);
        assert!(msg.argument().chars().all(|c| c == '🦀'));
        assert_eq!(ControlMessage::decode(&msg.encode()), msg);
    }

    #[test]
    fn test_argument_without_separator() {
        // A sender that packs the argument right after the token
        let mut buf = [0u8; MESSAGE_SIZE];
        buf[..4].copy_from_slice(b"MKDR");
        buf[4..11].copy_from_slice(b"archive");
        let (token, argument) = decode(&buf);
        assert_eq!(&token, b"MKDR");
        assert_eq!(argument, "archive");
    }

    #[test]
    fn test_unknown_token_decodes() {
        let buf = encode(b"NOPE", "x");
        let msg = ControlMessage::decode(&buf);
        assert_eq!(msg.token(), b"NOPE");
        assert_eq!(msg.command(), None);
    }

    #[test]
    fn test_int32_is_big_endian() {
        assert_eq!(encode_int32(230), [0, 0, 0, 230]);
        assert_eq!(encode_int32(8901), [0, 0, 0x22, 0xC5]);
        assert_eq!(decode_int32([0, 0, 0x01, 0xF6]), 502);
    }

    #[tokio::test]
    async fn test_stream_helpers() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        send_message(&mut a, &ControlMessage::new(Command::Delete, "old.log"))
            .await
            .unwrap();
        send_status(&mut a, StatusCode::TransferComplete).await.unwrap();
        send_port(&mut a, 8923).await.unwrap();

        let msg = recv_message(&mut b).await.unwrap();
        assert_eq!(msg.command(), Some(Command::Delete));
        assert_eq!(msg.argument(), "old.log");
        assert_eq!(recv_int32(&mut b).await.unwrap(), 226);
        assert_eq!(recv_int32(&mut b).await.unwrap(), 8923);
    }

    #[tokio::test]
    async fn test_short_frame_is_eof() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        a.write_all(b"LIST").await.unwrap();
        drop(a);

        let err = recv_message(&mut b).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
