use std::io;
use std::path::Path;
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::constants::{CHUNK_SIZE, ChunkFraming};
use super::listing::build_listing;
use crate::error::TransferError;

/// Stream a file over an open data connection, then close the write side.
/// Returns the number of payload bytes sent.
pub async fn send_file<W>(
    stream: &mut W,
    path: &Path,
    framing: ChunkFraming,
) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin,
{
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TransferError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if !file.metadata().await?.is_file() {
        return Err(TransferError::NotFound(path.display().to_string()));
    }

    let start_time = Instant::now();
    let sent = stream_chunks(&mut file, stream, framing).await?;
    stream.shutdown().await?;

    debug!(
        "File {} sent: {} bytes in {:.2?}",
        path.display(),
        sent,
        start_time.elapsed()
    );
    Ok(sent)
}

/// Materialize the listing of `dir` and stream it exactly like a file
pub async fn send_listing<W>(
    stream: &mut W,
    dir: &Path,
    framing: ChunkFraming,
) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin,
{
    let listing = build_listing(dir).await?;
    let sent = stream_chunks(&mut listing.as_slice(), stream, framing).await?;
    stream.shutdown().await?;

    debug!("Listing of {} sent: {} bytes", dir.display(), sent);
    Ok(sent)
}

/// Copy `reader` to `writer` in fixed-size chunks. Returns payload bytes
/// written; NUL terminators are not counted.
pub async fn stream_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    framing: ChunkFraming,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let payload = framing.payload_len();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut sent: u64 = 0;

    loop {
        let n = reader.read(&mut buffer[..payload]).await?;
        if n == 0 {
            break;
        }
        let frame_len = match framing {
            ChunkFraming::Raw => n,
            ChunkFraming::NulTerminated => {
                buffer[n] = 0;
                n + 1
            }
        };
        writer.write_all(&buffer[..frame_len]).await?;
        sent += n as u64;
    }

    writer.flush().await?;
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::receiver::receive_file;

    async fn round_trip(content: &[u8]) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.bin");
        let target = dir.path().join("target.bin");
        std::fs::write(&source, content).unwrap();

        let (mut tx, mut rx) = tokio::io::duplex(CHUNK_SIZE * 4);
        let (sent, received) = tokio::join!(
            send_file(&mut tx, &source, ChunkFraming::Raw),
            receive_file(&mut rx, &target)
        );
        assert_eq!(sent.unwrap(), content.len() as u64);
        assert_eq!(received.unwrap(), content.len() as u64);

        std::fs::read(&target).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_is_byte_identical() {
        let content: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 251) as u8).collect();
        assert_eq!(round_trip(&content).await, content);
    }

    #[tokio::test]
    async fn test_round_trip_zero_length() {
        assert!(round_trip(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_exact_chunk_multiple() {
        let content = vec![0xABu8; CHUNK_SIZE * 3];
        assert_eq!(round_trip(&content).await, content);
    }

    #[tokio::test]
    async fn test_round_trip_with_nul_bytes() {
        let content = b"a\0b\0\0c".repeat(50);
        assert_eq!(round_trip(&content).await, content);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (mut tx, _rx) = tokio::io::duplex(64);
        let result = send_file(&mut tx, &dir.path().join("missing.txt"), ChunkFraming::Raw).await;
        assert!(matches!(result, Err(TransferError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut tx, _rx) = tokio::io::duplex(64);
        let result = send_file(&mut tx, dir.path(), ChunkFraming::Raw).await;
        assert!(matches!(result, Err(TransferError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_nul_terminated_framing() {
        let payload = vec![b'x'; CHUNK_SIZE * 2];
        let mut out = Vec::new();
        let sent = stream_chunks(&mut payload.as_slice(), &mut out, ChunkFraming::NulTerminated)
            .await
            .unwrap();

        assert_eq!(sent, payload.len() as u64);
        // 256 payload bytes need three 127-byte chunks, each with a NUL
        assert_eq!(out.len(), payload.len() + 3);
        assert_eq!(out[CHUNK_SIZE - 1], 0);
        assert_eq!(*out.last().unwrap(), 0);
        let stripped: Vec<u8> = out.into_iter().filter(|&b| b != 0).collect();
        assert_eq!(stripped, payload);
    }
}
