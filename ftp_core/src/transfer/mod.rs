//! Data connection transfers.
//!
//! This module provides:
//! - File sending and receiving over an open data connection
//! - Directory listings streamed like files
//! - Path resolution confined to the server root

pub mod constants;
pub mod listing;
pub mod receiver;
pub mod sender;
pub mod utils;

// Re-export public API
pub use constants::{CHUNK_SIZE, ChunkFraming};
pub use listing::build_listing;
pub use receiver::receive_file;
pub use sender::{send_file, send_listing, stream_chunks};
pub use utils::{display_virtual, resolve_virtual};
