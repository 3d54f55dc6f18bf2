use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::constants::CHUNK_SIZE;
use crate::error::TransferError;

/// Write everything read from `stream` into `path` until the peer closes.
/// Any existing file is overwritten. Returns the number of bytes written.
pub async fn receive_file<R>(stream: &mut R, path: &Path) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
{
    let mut file = File::create(path).await?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut received: u64 = 0;

    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n]).await?;
        received += n as u64;
    }

    file.flush().await?;
    debug!("File {} received: {} bytes", path.display(), received);
    Ok(received)
}
