//! # Ping Client Library
//!
//! Sends a single ping (timestamp and character) to the relay server and,
//! unless told otherwise, keeps listening for the messages the server relays
//! back while this client's broadcast window is open.
//!
//! - [`args`]: command-line arguments and their parsers
//! - [`network`]: the UDP client

pub mod args;
pub mod network;

pub use network::Client;
