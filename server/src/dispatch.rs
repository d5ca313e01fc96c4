//! Relay bookkeeping between the receive and send halves of the event loop
//!
//! Received messages wait in a drop-oldest [`Buffer`]. When the socket is
//! writable the oldest entry is popped, its recipients are computed from the
//! [`Connections`] tracker at the entry's *arrival* time, its text is replaced
//! by the broadcast content, and recipients are then served one per
//! write-ready event. A recipient that hit backpressure goes back to the
//! front of the line so it is retried before anyone after it.

use crate::buffer::Buffer;
use crate::config::ServerConfig;
use crate::connections::{Connections, SenderPolicy};
use log::{debug, warn};
use shared::{ConnectionError, Message, SendStatus};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::num::NonZeroUsize;

/// A received message waiting to be relayed.
#[derive(Debug)]
pub struct BufferEntry {
    /// Server time at which the datagram was received.
    pub arrival: u64,
    pub sender: SocketAddr,
    pub message: Message,
}

/// The message currently being fanned out and who still needs it.
#[derive(Debug)]
struct Outgoing {
    message: Message,
    recipients: VecDeque<SocketAddr>,
}

#[derive(Debug)]
pub struct Dispatcher {
    queue: Buffer<BufferEntry>,
    connections: Connections,
    broadcast: Vec<u8>,
    sender_policy: SenderPolicy,
    current: Option<Outgoing>,
}

impl Dispatcher {
    pub fn new(
        capacity: NonZeroUsize,
        timeout: u64,
        broadcast: Vec<u8>,
        sender_policy: SenderPolicy,
    ) -> Self {
        Self {
            queue: Buffer::new(capacity),
            connections: Connections::new(timeout),
            broadcast,
            sender_policy,
            current: None,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.buffer_capacity,
            config.timeout,
            config.broadcast.clone(),
            config.sender_policy,
        )
    }

    /// Queues a valid message and records its sender.
    pub fn enqueue(&mut self, arrival: u64, sender: SocketAddr, message: Message) {
        if let Some(evicted) = self.queue.push(BufferEntry {
            arrival,
            sender,
            message,
        }) {
            warn!(
                "Queue full, dropped message from {} received at {}",
                evicted.sender, evicted.arrival
            );
        }
        self.connections.add_client(sender, arrival);
    }

    /// Records a sender whose datagram was rejected.
    pub fn record_presence(&mut self, sender: SocketAddr, time: u64) {
        self.connections.add_client(sender, time);
    }

    /// Whether a write-ready event could do any work.
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
            || self
                .current
                .as_ref()
                .is_some_and(|outgoing| !outgoing.recipients.is_empty())
    }

    /// Hands the current message and its next recipient to `send`, moving
    /// on to the next queued message when the current one is done.
    ///
    /// A recipient that would block is put back at the front and retried by
    /// the next call; one that fails hard is dropped. Returns the recipient
    /// that was attempted, or `None` when there was nothing to send.
    pub fn send_next<F>(&mut self, send: F) -> Option<SocketAddr>
    where
        F: FnOnce(SocketAddr, &Message) -> Result<SendStatus, ConnectionError>,
    {
        self.prepare();
        let outgoing = self.current.as_mut()?;
        let recipient = outgoing.recipients.pop_front()?;

        match send(recipient, &outgoing.message) {
            Ok(SendStatus::Sent) => debug!("Relayed message to {}", recipient),
            Ok(SendStatus::WouldBlock) => {
                debug!("Send to {} would block, retrying later", recipient);
                outgoing.recipients.push_front(recipient);
            }
            Err(e) => warn!("Dropping recipient {}: {}", recipient, e),
        }
        Some(recipient)
    }

    pub fn queued(&self) -> usize {
        self.queue.size()
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    fn prepare(&mut self) {
        while !self
            .current
            .as_ref()
            .is_some_and(|outgoing| !outgoing.recipients.is_empty())
        {
            let Ok(entry) = self.queue.pop() else {
                self.current = None;
                return;
            };

            let exclude = match self.sender_policy {
                SenderPolicy::Include => None,
                SenderPolicy::Exclude => Some(entry.sender),
            };
            let recipients = self.connections.get_clients(entry.arrival, exclude);
            if recipients.is_empty() {
                debug!("No recipients for message from {}", entry.sender);
                self.current = None;
                continue;
            }

            let mut message = entry.message;
            if let Err(e) = message.set_text(self.broadcast.as_slice()) {
                warn!("Dropping message from {}: {}", entry.sender, e);
                self.current = None;
                continue;
            }

            debug!(
                "Relaying message from {} to {} recipients",
                entry.sender,
                recipients.len()
            );
            self.current = Some(Outgoing {
                message,
                recipients,
            });
        }
    }
}
