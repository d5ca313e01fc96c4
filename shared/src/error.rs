use crate::{HEADER_SIZE, MAX_DATAGRAM_SIZE, MAX_TIMESTAMP};
use std::io;
use std::net::SocketAddr;

/// A datagram or message that violates the wire format.
#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    #[error("datagram of {len} bytes is shorter than the {} byte header", HEADER_SIZE)]
    TooShort { len: usize },
    #[error("timestamp {0} is past the maximum of {}", MAX_TIMESTAMP)]
    TimestampOutOfRange(u64),
    #[error("{len} bytes exceed the maximum datagram size of {}", MAX_DATAGRAM_SIZE)]
    TooLong { len: usize },
    #[error("malformed header: {0}")]
    Header(#[from] bincode::Error),
}

/// Hard transport failure. Would-block is never reported through this type.
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("short write: sent {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },
    #[error("could not encode message: {0}")]
    Encode(#[from] ProtocolError),
}

/// Failure to receive one datagram.
#[derive(thiserror::Error, Debug)]
pub enum ReceiveError {
    /// The datagram arrived but could not be decoded. The sender address is
    /// kept so callers can still account for the peer.
    #[error("invalid datagram from {from}: {source}")]
    Protocol {
        from: SocketAddr,
        #[source]
        source: ProtocolError,
    },
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
