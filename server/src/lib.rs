//! # Relay Server Library
//!
//! This library provides the server side of the ping relay. Clients send short
//! ping datagrams; the server remembers who pinged recently and relays every
//! received message, its text replaced by a fixed broadcast text, to each client
//! whose broadcast window was open when the message arrived.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! One thread owns the socket, the poll set, the queue and the client
//! tracker. The only suspension point is the blocking poll wait; every socket
//! operation is non-blocking, so no locks are needed and all state changes
//! happen in a fixed order.
//!
//! ### Bounded Queue
//! Received messages wait in a fixed-capacity ring queue. When it is full the
//! oldest message is dropped, so under sustained overload the newest pings
//! always get a slot.
//!
//! ### Arrival-Time Fan-Out
//! Recipients are computed from the time a message *arrived*, not the time it
//! is sent. A message that waited in the queue still reaches the clients
//! that were present when it came in.
//!
//! ### Backpressure
//! Recipients are served one per write-ready event. When the socket would
//! block, the recipient is put back at the front of the line and retried on
//! the next write-ready event.
//!
//! ## Module Organization
//!
//! - [`buffer`]: drop-oldest ring queue
//! - [`connections`]: per-client broadcast windows
//! - [`poll`]: fixed-capacity readiness set over `mio`
//! - [`dispatch`]: queue, tracker and in-flight fan-out state
//! - [`network`]: the event loop
//! - [`config`]: command-line arguments and validated configuration
//! - [`shutdown`]: cross-thread stop handle
//! - [`clock`]: arrival-time source
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new(20160, "message of the day");
//!     let mut server = Server::bind(config)?;
//!
//!     // Stop from another thread (e.g. a signal handler) with:
//!     let _handle = server.shutdown_handle();
//!
//!     server.run()?;
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod clock;
pub mod config;
pub mod connections;
pub mod dispatch;
pub mod error;
pub mod network;
pub mod poll;
pub mod shutdown;

pub use error::ServerError;
