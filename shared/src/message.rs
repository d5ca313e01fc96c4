//! Wire codec for ping and broadcast datagrams.
//!
//! ```text
//! offset 0..8  : timestamp, unsigned 64-bit, big-endian
//! offset 8     : character, 1 byte
//! offset 9..N  : text, 0..(MAX_DATAGRAM_SIZE - 9) raw bytes
//! ```
//!
//! The header is encoded with bincode using fixed-width big-endian integers,
//! which yields exactly the 9 bytes above. The text is appended raw.

use crate::error::ProtocolError;
use crate::{HEADER_SIZE, MAX_DATAGRAM_SIZE, MAX_TIMESTAMP};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Returns whether the timestamp is inside the accepted range.
pub fn is_proper_timestamp(timestamp: u64) -> bool {
    timestamp <= MAX_TIMESTAMP
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
struct Header {
    timestamp: u64,
    character: u8,
}

fn header_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
}

/// A ping or broadcast unit.
///
/// Every constructor and mutator validates the timestamp bound and the
/// encoded size, so a `Message` value always encodes to a valid datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    timestamp: u64,
    character: u8,
    text: Vec<u8>,
}

impl Message {
    /// Creates a message without text, as sent by a pinging client.
    pub fn new(timestamp: u64, character: u8) -> Result<Self, ProtocolError> {
        Self::with_text(timestamp, character, Vec::new())
    }

    pub fn with_text(
        timestamp: u64,
        character: u8,
        text: impl Into<Vec<u8>>,
    ) -> Result<Self, ProtocolError> {
        let message = Self {
            timestamp,
            character,
            text: text.into(),
        };
        message.validate()?;
        Ok(message)
    }

    /// Decodes a received datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::TooShort { len: bytes.len() });
        }
        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::TooLong { len: bytes.len() });
        }

        let header: Header = header_options().deserialize(&bytes[..HEADER_SIZE])?;
        Self::with_text(
            header.timestamp,
            header.character,
            &bytes[HEADER_SIZE..],
        )
    }

    /// Encodes the message into exactly `HEADER_SIZE + text.len()` bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let header = Header {
            timestamp: self.timestamp,
            character: self.character,
        };

        let mut bytes = Vec::with_capacity(self.encoded_len());
        header_options().serialize_into(&mut bytes, &header)?;
        bytes.extend_from_slice(&self.text);
        Ok(bytes)
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.text.len()
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn character(&self) -> u8 {
        self.character
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// Replaces the text. Leaves the message untouched on failure.
    pub fn set_text(&mut self, text: impl Into<Vec<u8>>) -> Result<(), ProtocolError> {
        let text = text.into();
        check_size(HEADER_SIZE + text.len())?;
        check_timestamp(self.timestamp)?;
        self.text = text;
        Ok(())
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_timestamp(self.timestamp)?;
        check_size(self.encoded_len())
    }
}

fn check_timestamp(timestamp: u64) -> Result<(), ProtocolError> {
    if is_proper_timestamp(timestamp) {
        Ok(())
    } else {
        Err(ProtocolError::TimestampOutOfRange(timestamp))
    }
}

fn check_size(len: usize) -> Result<(), ProtocolError> {
    if len > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::TooLong { len });
    }
    Ok(())
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.timestamp,
            self.character as char,
            String::from_utf8_lossy(&self.text)
        )
    }
}
