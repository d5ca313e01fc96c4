//! Fixed-capacity readiness set over raw file descriptors, backed by `mio`.
//!
//! Entries are stored densely. Removing a descriptor moves the last entry
//! into the freed slot, so positions are not stable across mutation; look
//! entries up by descriptor instead. Each descriptor is registered under
//! `Token(fd)`.
//!
//! `mio` reports readiness edge-triggered. [`Poll::wait`] re-arms every entry
//! that was ready on the previous wait, so a descriptor that is still ready
//! is reported again, the way `poll(2)` would.

use mio::event::Event;
use mio::unix::SourceFd;
use mio::{Events, Token, Waker};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

pub use mio::Interest;

/// Reserved for the cross-thread [`Waker`]; never a descriptor token.
const WAKE_TOKEN: Token = Token(usize::MAX);

#[derive(thiserror::Error, Debug)]
pub enum PollError {
    #[error("descriptor {0} is already in the poll set")]
    AlreadyRegistered(RawFd),
    #[error("descriptor {0} is not in the poll set")]
    NotRegistered(RawFd),
    #[error("poll set is full ({capacity} descriptors)")]
    Full { capacity: usize },
    #[error("invalid descriptor {0}, must be positive")]
    InvalidDescriptor(RawFd),
    #[error("no descriptor became ready before the timeout")]
    Timeout,
    #[error("wait interrupted by a signal")]
    Interrupted,
    #[error("poll failed: {0}")]
    Failed(#[source] io::Error),
}

impl PollError {
    /// Timeouts and signal interruptions leave the set intact.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PollError::Timeout | PollError::Interrupted)
    }
}

/// Events observed on a descriptor by the last [`Poll::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness(u8);

impl Readiness {
    const READABLE: u8 = 0b001;
    const WRITABLE: u8 = 0b010;
    const ERROR: u8 = 0b100;

    pub fn is_readable(self) -> bool {
        self.0 & Self::READABLE != 0
    }

    pub fn is_writable(self) -> bool {
        self.0 & Self::WRITABLE != 0
    }

    pub fn is_error(self) -> bool {
        self.0 & Self::ERROR != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn merge(&mut self, event: &Event) {
        if event.is_readable() {
            self.0 |= Self::READABLE;
        }
        if event.is_writable() {
            self.0 |= Self::WRITABLE;
        }
        if event.is_error() {
            self.0 |= Self::ERROR;
        }
    }
}

/// Snapshot of one watched descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollEntry {
    pub fd: RawFd,
    pub interest: Interest,
    pub readiness: Readiness,
}

pub struct Poll {
    poll: mio::Poll,
    events: Events,
    entries: Vec<PollEntry>,
    capacity: usize,
    woken: bool,
}

impl Poll {
    pub fn new(capacity: usize) -> io::Result<Self> {
        Ok(Self {
            poll: mio::Poll::new()?,
            // One extra slot for the waker.
            events: Events::with_capacity(capacity + 1),
            entries: Vec::with_capacity(capacity),
            capacity,
            woken: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_descriptor(&mut self, fd: RawFd, interest: Interest) -> Result<(), PollError> {
        check_descriptor(fd)?;
        if self.position(fd).is_some() {
            return Err(PollError::AlreadyRegistered(fd));
        }
        if self.entries.len() == self.capacity {
            return Err(PollError::Full {
                capacity: self.capacity,
            });
        }

        self.poll
            .registry()
            .register(&mut SourceFd(&fd), token(fd), interest)
            .map_err(PollError::Failed)?;
        self.entries.push(PollEntry {
            fd,
            interest,
            readiness: Readiness::default(),
        });
        Ok(())
    }

    pub fn remove_descriptor(&mut self, fd: RawFd) -> Result<(), PollError> {
        check_descriptor(fd)?;
        let index = self.position(fd).ok_or(PollError::NotRegistered(fd))?;

        self.poll
            .registry()
            .deregister(&mut SourceFd(&fd))
            .map_err(PollError::Failed)?;
        self.entries.swap_remove(index);
        Ok(())
    }

    /// Replaces the interest of a registered descriptor. Its last readiness
    /// is kept until the next wait.
    pub fn set_interest(&mut self, fd: RawFd, interest: Interest) -> Result<(), PollError> {
        check_descriptor(fd)?;
        let index = self.position(fd).ok_or(PollError::NotRegistered(fd))?;

        self.poll
            .registry()
            .reregister(&mut SourceFd(&fd), token(fd), interest)
            .map_err(PollError::Failed)?;
        self.entries[index].interest = interest;
        Ok(())
    }

    pub fn get(&self, fd: RawFd) -> Result<PollEntry, PollError> {
        check_descriptor(fd)?;
        self.position(fd)
            .map(|index| self.entries[index])
            .ok_or(PollError::NotRegistered(fd))
    }

    /// Creates the waker that interrupts [`wait`](Poll::wait) from another
    /// thread. Only one waker may be active per set.
    pub fn waker(&self) -> io::Result<Waker> {
        Waker::new(self.poll.registry(), WAKE_TOKEN)
    }

    /// Whether the last wait was interrupted through the waker.
    pub fn is_woken(&self) -> bool {
        self.woken
    }

    /// Blocks until at least one descriptor is ready, the waker fires or
    /// `timeout` elapses. `None` waits indefinitely.
    ///
    /// Returns the number of ready descriptors, counting the waker.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<usize, PollError> {
        self.rearm()?;
        for entry in &mut self.entries {
            entry.readiness = Readiness::default();
        }
        self.woken = false;

        if let Err(e) = self.poll.poll(&mut self.events, timeout) {
            return Err(if e.kind() == io::ErrorKind::Interrupted {
                PollError::Interrupted
            } else {
                PollError::Failed(e)
            });
        }

        for event in self.events.iter() {
            if event.token() == WAKE_TOKEN {
                self.woken = true;
                continue;
            }
            if let Some(entry) = self
                .entries
                .iter_mut()
                .find(|entry| token(entry.fd) == event.token())
            {
                entry.readiness.merge(event);
            }
        }

        let ready = self
            .entries
            .iter()
            .filter(|entry| !entry.readiness.is_empty())
            .count()
            + usize::from(self.woken);
        if ready == 0 {
            return Err(PollError::Timeout);
        }
        Ok(ready)
    }

    /// Active entries with their last observed readiness.
    pub fn iter(&self) -> impl Iterator<Item = PollEntry> + '_ {
        self.entries.iter().copied()
    }

    /// Re-registering makes the selector report a still-ready descriptor
    /// again on the next wait.
    fn rearm(&mut self) -> Result<(), PollError> {
        let registry = self.poll.registry();
        for entry in self.entries.iter().filter(|entry| !entry.readiness.is_empty()) {
            registry
                .reregister(&mut SourceFd(&entry.fd), token(entry.fd), entry.interest)
                .map_err(PollError::Failed)?;
        }
        Ok(())
    }

    fn position(&self, fd: RawFd) -> Option<usize> {
        self.entries.iter().position(|entry| entry.fd == fd)
    }
}

fn token(fd: RawFd) -> Token {
    Token(fd as usize)
}

fn check_descriptor(fd: RawFd) -> Result<(), PollError> {
    if fd <= 0 {
        return Err(PollError::InvalidDescriptor(fd));
    }
    Ok(())
}
