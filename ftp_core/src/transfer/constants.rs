use serde::{Deserialize, Serialize};

use crate::protocol::MESSAGE_SIZE;

/// Chunk size for data connection transfers
pub const CHUNK_SIZE: usize = MESSAGE_SIZE;

/// How outgoing chunks are laid out on a data connection. There is never a
/// length prefix: the receiver reads until the sender closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFraming {
    /// Payload bytes only
    #[default]
    Raw,
    /// Up to `CHUNK_SIZE - 1` payload bytes followed by one NUL, for peers
    /// that print each chunk as a C string
    NulTerminated,
}

impl ChunkFraming {
    /// Payload bytes carried by one chunk
    pub fn payload_len(self) -> usize {
        match self {
            ChunkFraming::Raw => CHUNK_SIZE,
            ChunkFraming::NulTerminated => CHUNK_SIZE - 1,
        }
    }
}
