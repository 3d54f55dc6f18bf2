//! Control connection wire protocol.
//!
//! This module provides:
//! - The fixed command vocabulary
//! - Status codes
//! - The fixed-width message codec and its stream helpers

pub mod codec;
pub mod command;
pub mod constants;
pub mod status;

// Re-export public API
pub use codec::{
    ControlMessage, decode, decode_int32, encode, encode_int32, recv_int32, recv_message,
    send_message, send_port, send_status,
};
pub use command::Command;
pub use constants::{MAX_ARG_LEN, MESSAGE_SIZE, TOKEN_LEN};
pub use status::StatusCode;
