use crate::poll::PollError;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Failures that stop the server. Everything recoverable is handled inside
/// the event loop and never surfaces here.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("could not read {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("buffer size must be greater than zero")]
    ZeroBufferSize,
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error("socket setup failed: {0}")]
    Io(#[from] io::Error),
}
