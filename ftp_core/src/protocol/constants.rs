/// Width of one control message on the wire. The buffer size is the message.
pub const MESSAGE_SIZE: usize = 128;

/// Width of the command token at the start of every control message
pub const TOKEN_LEN: usize = 4;

/// Offset of the first argument byte (token plus one NUL separator)
pub const ARG_OFFSET: usize = TOKEN_LEN + 1;

/// Longest argument that survives encoding
pub const MAX_ARG_LEN: usize = MESSAGE_SIZE - ARG_OFFSET;

/// Default control port
pub const CONTROL_PORT: u16 = 2121;

/// Lower bound (inclusive) of the data port range
pub const DATA_PORT_FLOOR: u16 = 8900;

/// Upper bound (exclusive) of the data port range
pub const DATA_PORT_CEIL: u16 = 8950;

/// Identity that bypasses the secret check
pub const ANONYMOUS: &str = "anonymous";
