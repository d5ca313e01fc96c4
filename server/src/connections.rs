//! Time-windowed tracking of clients that pinged the server
//!
//! Every ping from an address opens (or extends) a broadcast window of
//! `[t, t + timeout]`. A message is relayed to every client whose window
//! contains the message's *arrival* time, so a message that sat in the
//! queue for a while still reaches the clients that were present when it
//! arrived.
//!
//! Windows are kept per client in ascending, non-overlapping order. Expired
//! windows are dropped lazily by [`Connections::get_clients`], which is the
//! only eviction path.

use log::debug;
use std::collections::VecDeque;
use std::net::SocketAddr;

/// Default broadcast window length in seconds.
pub const DEFAULT_TIMEOUT: u64 = 2 * 60;

/// Closed time window `[start, end]` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn contains(&self, timestamp: u64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Whether a message is relayed back to the client that sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderPolicy {
    /// The sender is treated like any other recipient.
    #[default]
    Include,
    /// The sender never receives its own message.
    Exclude,
}

/// A client address and its broadcast windows, oldest first
#[derive(Debug)]
pub struct ClientRecord {
    pub address: SocketAddr,
    intervals: VecDeque<Interval>,
}

impl ClientRecord {
    fn new(address: SocketAddr, time: u64, timeout: u64) -> Self {
        let mut intervals = VecDeque::new();
        intervals.push_back(Interval {
            start: time,
            end: time.saturating_add(timeout),
        });
        Self { address, intervals }
    }

    /// Extends the latest window if `time` falls inside it, otherwise opens
    /// a new one.
    fn add_connection(&mut self, time: u64, timeout: u64) {
        let end = time.saturating_add(timeout);
        match self.intervals.back_mut() {
            Some(last) if last.end >= time => last.end = last.end.max(end),
            _ => self.intervals.push_back(Interval { start: time, end }),
        }
    }

    /// Drops windows that ended before `timestamp`.
    fn purge_before(&mut self, timestamp: u64) {
        while self
            .intervals
            .front()
            .is_some_and(|interval| interval.end < timestamp)
        {
            self.intervals.pop_front();
        }
    }

    pub fn intervals(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }
}

/// Tracks every client seen within the broadcast windows.
///
/// Lookup is a linear scan by address, which is fine for the small client
/// counts a single relay serves.
#[derive(Debug)]
pub struct Connections {
    clients: Vec<ClientRecord>,
    timeout: u64,
}

impl Connections {
    pub fn new(timeout: u64) -> Self {
        Self {
            clients: Vec::new(),
            timeout,
        }
    }

    /// Records a ping from `address` received at `time`.
    pub fn add_client(&mut self, address: SocketAddr, time: u64) {
        if let Some(client) = self.clients.iter_mut().find(|c| c.address == address) {
            client.add_connection(time, self.timeout);
            return;
        }

        debug!("Tracking new client {}", address);
        self.clients
            .push(ClientRecord::new(address, time, self.timeout));
    }

    /// Returns the clients whose window contains `timestamp`, in the order
    /// they were first seen.
    ///
    /// Windows that ended before `timestamp` are purged, and a client left
    /// without any window is forgotten. `exclude` is skipped in the result
    /// but still purged.
    pub fn get_clients(
        &mut self,
        timestamp: u64,
        exclude: Option<SocketAddr>,
    ) -> VecDeque<SocketAddr> {
        let mut recipients = VecDeque::new();

        self.clients.retain_mut(|client| {
            client.purge_before(timestamp);
            let Some(current) = client.intervals.front() else {
                debug!("Forgetting client {}", client.address);
                return false;
            };

            if current.contains(timestamp) && Some(client.address) != exclude {
                recipients.push_back(client.address);
            }
            true
        });

        recipients
    }

    pub fn get(&self, address: SocketAddr) -> Option<&ClientRecord> {
        self.clients.iter().find(|c| c.address == address)
    }

    /// Number of tracked clients, including ones whose windows have lapsed
    /// but were not purged yet.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for Connections {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
