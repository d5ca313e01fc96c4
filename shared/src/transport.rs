//! Single-attempt datagram I/O over a non-blocking UDP socket.
//!
//! Neither [`Sender`] nor [`Receiver`] retries. A would-block condition is
//! reported as an ordinary outcome so the caller decides when to try again.

use crate::error::{ConnectionError, ReceiveError};
use crate::message::Message;
use crate::MAX_DATAGRAM_SIZE;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

/// Owned receive buffer with an explicit filled length.
///
/// One byte larger than the biggest valid datagram so that an oversized
/// datagram is detected instead of being silently truncated.
pub struct Datagram {
    bytes: Box<[u8]>,
    len: usize,
}

impl Datagram {
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; MAX_DATAGRAM_SIZE + 1].into_boxed_slice(),
            len: 0,
        }
    }

    /// The bytes of the last received datagram.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for Datagram {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a send attempt that did not fail hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    /// The socket buffer is full; nothing was written.
    WouldBlock,
}

pub struct Sender<'a> {
    socket: &'a UdpSocket,
}

impl<'a> Sender<'a> {
    pub fn new(socket: &'a UdpSocket) -> Self {
        Self { socket }
    }

    /// Encodes `message` and writes it to `address` in a single call.
    pub fn send(&self, address: SocketAddr, message: &Message) -> Result<SendStatus, ConnectionError> {
        let bytes = message.encode()?;

        match self.socket.send_to(&bytes, address) {
            Ok(sent) if sent == bytes.len() => Ok(SendStatus::Sent),
            Ok(sent) => Err(ConnectionError::ShortWrite {
                sent,
                expected: bytes.len(),
            }),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(SendStatus::WouldBlock),
            Err(source) => Err(ConnectionError::Io {
                op: "send_to",
                source,
            }),
        }
    }
}

pub struct Receiver<'a> {
    socket: &'a UdpSocket,
}

impl<'a> Receiver<'a> {
    pub fn new(socket: &'a UdpSocket) -> Self {
        Self { socket }
    }

    /// Reads one datagram into `datagram`.
    ///
    /// Returns `Ok(None)` when nothing is waiting (would-block or an
    /// interrupted call).
    pub fn receive(&self, datagram: &mut Datagram) -> Result<Option<SocketAddr>, ConnectionError> {
        datagram.clear();
        match self.socket.recv_from(&mut datagram.bytes) {
            Ok((len, from)) => {
                datagram.len = len;
                Ok(Some(from))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(None)
            }
            Err(source) => Err(ConnectionError::Io {
                op: "recv_from",
                source,
            }),
        }
    }

    /// Reads and decodes one datagram.
    pub fn receive_message(
        &self,
        datagram: &mut Datagram,
    ) -> Result<Option<(SocketAddr, Message)>, ReceiveError> {
        let Some(from) = self.receive(datagram)? else {
            return Ok(None);
        };

        match Message::decode(datagram.as_slice()) {
            Ok(message) => Ok(Some((from, message))),
            Err(source) => Err(ReceiveError::Protocol { from, source }),
        }
    }
}
