//! Client network layer: sends the ping and listens for relayed messages

use log::{debug, error, info, warn};
use shared::{Message, MAX_DATAGRAM_SIZE};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::{lookup_host, UdpSocket};

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
}

impl Client {
    /// Resolves `host` (IPv4 preferred) and binds a local socket of the
    /// matching family.
    pub async fn new(host: &str, port: u16) -> Result<Self, Box<dyn std::error::Error>> {
        let addrs: Vec<SocketAddr> = lookup_host((host, port)).await?.collect();
        let server_addr = addrs
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| format!("no address found for {}", host))?;

        let bind_addr = if server_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        info!(
            "Client socket bound to {}, server at {}",
            socket.local_addr()?,
            server_addr
        );

        Ok(Client {
            socket,
            server_addr,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn ping(&self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        let data = message.encode()?;
        self.socket.send_to(&data, self.server_addr).await?;
        debug!("Sent ping '{}' to {}", message, self.server_addr);
        Ok(())
    }

    /// Hands every valid relayed message to `on_message` until `shutdown`
    /// completes. Invalid datagrams are logged and skipped.
    pub async fn listen<F, H>(&self, shutdown: F, mut on_message: H)
    where
        F: Future<Output = ()>,
        H: FnMut(Message),
    {
        tokio::pin!(shutdown);
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE + 1];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, from)) => match Message::decode(&buffer[..len]) {
                            Ok(message) => on_message(message),
                            Err(e) => warn!("Invalid datagram from {}: {}", from, e),
                        },
                        Err(e) => error!("Error receiving datagram: {}", e),
                    }
                },

                _ = &mut shutdown => {
                    info!("Stopping client");
                    return;
                },
            }
        }
    }
}
