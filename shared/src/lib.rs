//! # Shared Protocol Library
//!
//! Types and constants used by both the relay server and the ping client:
//!
//! - [`message`]: the binary wire codec for ping and broadcast datagrams
//! - [`transport`]: single-attempt, non-blocking datagram send/receive
//! - [`error`]: protocol and connection error types
//!
//! The wire format is deliberately minimal. A datagram is a big-endian
//! 64-bit timestamp, one character byte and an optional raw text tail, with
//! no length prefix: the datagram length is the message length.

pub mod error;
pub mod message;
pub mod transport;

pub use error::{ConnectionError, ProtocolError, ReceiveError};
pub use message::{is_proper_timestamp, Message};
pub use transport::{Datagram, Receiver, SendStatus, Sender};

/// Largest accepted timestamp: 2041-12-31 23:59:59 UTC.
pub const MAX_TIMESTAMP: u64 = 71_697_398_399;
/// Largest datagram either side will encode or accept.
pub const MAX_DATAGRAM_SIZE: usize = 65_536;
/// Timestamp (8 bytes) plus character (1 byte).
pub const HEADER_SIZE: usize = 9;
/// Longest text that still fits in a datagram.
pub const MAX_TEXT_SIZE: usize = MAX_DATAGRAM_SIZE - HEADER_SIZE;
/// Port the client targets when none is given.
pub const DEFAULT_PORT: u16 = 20160;
