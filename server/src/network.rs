//! Server network layer: the single-threaded, poll-driven relay loop

use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::poll::{Interest, Poll};
use crate::shutdown::{Shutdown, ShutdownHandle};
use log::{debug, error, info, warn};
use shared::{Datagram, ReceiveError, Receiver, Sender};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::os::fd::AsRawFd;

/// Only the relay socket; the shutdown waker does not take a slot.
const POLL_CAPACITY: usize = 1;

/// Relay server owning the socket, the poll set and all relay state.
///
/// Every operation except [`Poll::wait`] is non-blocking, so the loop only
/// ever suspends while waiting for readiness.
pub struct Server<C: Clock = SystemClock> {
    socket: UdpSocket,
    poll: Poll,
    dispatcher: Dispatcher,
    datagram: Datagram,
    shutdown: Shutdown,
    clock: C,
}

impl Server<SystemClock> {
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Server<C> {
    /// Binds the socket in non-blocking mode and registers it for reading.
    pub fn with_clock(config: ServerConfig, clock: C) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let socket = UdpSocket::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        socket.set_nonblocking(true)?;

        let mut poll = Poll::new(POLL_CAPACITY)?;
        poll.add_descriptor(socket.as_raw_fd(), Interest::READABLE)?;
        let shutdown = Shutdown::new(&poll)?;

        info!(
            "Server listening on {} (buffer {}, window {}s, sender {:?})",
            socket.local_addr()?,
            config.buffer_capacity,
            config.timeout,
            config.sender_policy
        );

        Ok(Server {
            socket,
            poll,
            dispatcher: Dispatcher::from_config(&config),
            datagram: Datagram::new(),
            shutdown,
            clock,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle that stops [`run`](Server::run) from any thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.handle()
    }

    /// Runs the event loop until stopped.
    ///
    /// The stop flag is checked right after every wake-up; a receive or send
    /// already in progress always completes first.
    pub fn run(&mut self) -> Result<(), ServerError> {
        info!("Server started");

        loop {
            match self.poll.wait(None) {
                Ok(_) => {}
                Err(e) if e.is_recoverable() => debug!("Poll returned early: {}", e),
                Err(e) => return Err(e.into()),
            }

            if self.poll.is_woken() && self.shutdown.is_stopping() {
                info!("Server shutting down");
                return Ok(());
            }

            self.handle_events()?;
        }
    }

    fn handle_events(&mut self) -> Result<(), ServerError> {
        let socket_fd = self.socket.as_raw_fd();
        let readiness = self.poll.get(socket_fd)?.readiness;

        // Pending socket errors (e.g. ICMP unreachable) are cleared by a read.
        if readiness.is_readable() || readiness.is_error() {
            self.receive_data();
        }
        if readiness.is_writable() {
            self.send_data();
        }

        let interest = if self.dispatcher.has_pending() {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        self.poll.set_interest(socket_fd, interest)?;
        Ok(())
    }

    /// Reads one datagram, queues it and records its sender.
    ///
    /// A sender whose datagram fails to decode is still recorded.
    fn receive_data(&mut self) {
        let now = self.clock.now();

        match Receiver::new(&self.socket).receive_message(&mut self.datagram) {
            Ok(Some((from, message))) => {
                debug!("Received '{}' from {}", message, from);
                self.dispatcher.enqueue(now, from, message);
            }
            Ok(None) => {}
            Err(ReceiveError::Protocol { from, source }) => {
                warn!("Dropping datagram from {}: {}", from, source);
                self.dispatcher.record_presence(from, now);
            }
            Err(ReceiveError::Connection(e)) => error!("Error receiving datagram: {}", e),
        }
    }

    /// Sends the current message to its next recipient.
    fn send_data(&mut self) {
        let socket = &self.socket;
        self.dispatcher
            .send_next(|recipient, message| Sender::new(socket).send(recipient, message));
    }
}
