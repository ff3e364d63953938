pub mod api;
pub mod client;
pub mod server;

/// Bumped whenever the outbound snapshot document changes shape.
pub const PROTOCOL_VERSION: u32 = 1;

/// Wire encoding of a board value: -1 for a mine, 0..=8 otherwise.
pub const WIRE_MINE: i8 = -1;

/// Wire encoding of cell visibility.
pub const WIRE_HIDDEN: u8 = 0;
pub const WIRE_OPEN: u8 = 1;
pub const WIRE_FLAGGED: u8 = 2;
