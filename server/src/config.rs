//! Command-line arguments and the validated server configuration.

use crate::connections::{SenderPolicy, DEFAULT_TIMEOUT};
use crate::error::ServerError;
use clap::Parser;
use log::warn;
use shared::MAX_TEXT_SIZE;
use std::fs::File;
use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Ring queue capacity used when none is given.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

#[derive(Parser, Debug)]
#[command(author, version, about = "Relays pings to every client seen within the broadcast window")]
pub struct Args {
    /// Port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// File whose content is sent as the text of every relayed message
    pub filename: PathBuf,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Number of messages queued before the oldest is dropped
    #[arg(long, default_value_t = DEFAULT_BUFFER_CAPACITY)]
    pub buffer_size: usize,

    /// Broadcast window length in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT)]
    pub timeout: u64,

    /// Do not relay a message back to the client that sent it
    #[arg(long)]
    pub exclude_sender: bool,
}

impl Args {
    /// Validates the arguments and reads the broadcast file.
    pub fn into_config(self) -> Result<ServerConfig, ServerError> {
        let buffer_capacity =
            NonZeroUsize::new(self.buffer_size).ok_or(ServerError::ZeroBufferSize)?;
        let broadcast = ServerConfig::load_broadcast(&self.filename)?;

        Ok(ServerConfig {
            host: self.host,
            port: self.port,
            broadcast,
            buffer_capacity,
            timeout: self.timeout,
            sender_policy: if self.exclude_sender {
                SenderPolicy::Exclude
            } else {
                SenderPolicy::Include
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    /// 0 binds an ephemeral port.
    pub port: u16,
    /// Text of every relayed message.
    pub broadcast: Vec<u8>,
    pub buffer_capacity: NonZeroUsize,
    pub timeout: u64,
    pub sender_policy: SenderPolicy,
}

impl ServerConfig {
    /// Configuration with default capacity, timeout and sender policy.
    pub fn new(port: u16, broadcast: impl Into<Vec<u8>>) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
            broadcast: broadcast.into(),
            buffer_capacity: NonZeroUsize::new(DEFAULT_BUFFER_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            timeout: DEFAULT_TIMEOUT,
            sender_policy: SenderPolicy::default(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Reads the broadcast content, truncating it to what fits into a
    /// datagram next to the header.
    pub fn load_broadcast(path: &Path) -> Result<Vec<u8>, ServerError> {
        let read_error = |source| ServerError::ReadFile {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(read_error)?;
        let mut content = Vec::new();
        file.take(MAX_TEXT_SIZE as u64 + 1)
            .read_to_end(&mut content)
            .map_err(read_error)?;

        if content.len() > MAX_TEXT_SIZE {
            warn!(
                "File {:?} is longer than {} bytes, truncating",
                path, MAX_TEXT_SIZE
            );
            content.truncate(MAX_TEXT_SIZE);
        }
        Ok(content)
    }
}
