//! Cooperative stop signal for the blocking event loop.
//!
//! Setting the flag alone would not wake a wait without timeout, so
//! [`ShutdownHandle::stop`] also fires the poll set's [`Waker`].

use crate::poll::Poll;
use log::warn;
use mio::Waker;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable, thread-safe handle that asks a running server to stop.
#[derive(Clone)]
pub struct ShutdownHandle {
    stopping: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            warn!("Failed to wake the event loop: {}", e);
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

/// Loop-side half: the flag and the waker registered in the poll set.
pub(crate) struct Shutdown {
    stopping: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl Shutdown {
    pub(crate) fn new(poll: &Poll) -> io::Result<Self> {
        Ok(Self {
            stopping: Arc::new(AtomicBool::new(false)),
            waker: Arc::new(poll.waker()?),
        })
    }

    pub(crate) fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stopping: Arc::clone(&self.stopping),
            waker: Arc::clone(&self.waker),
        }
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_stop_sets_flag_and_wakes() {
        let mut poll = Poll::new(1).unwrap();
        let shutdown = Shutdown::new(&poll).unwrap();
        let handle = shutdown.handle();
        assert!(!shutdown.is_stopping());

        let remote = handle.clone();
        let worker = thread::spawn(move || remote.stop());

        poll.wait(Some(Duration::from_secs(2))).unwrap();
        assert!(poll.is_woken());
        assert!(shutdown.is_stopping());
        assert!(handle.is_stopping());
        worker.join().unwrap();
    }

    #[test]
    fn test_repeated_stop_wakes_once_per_wait() {
        let mut poll = Poll::new(1).unwrap();
        let shutdown = Shutdown::new(&poll).unwrap();
        let handle = shutdown.handle();

        handle.stop();
        handle.stop();
        assert_eq!(poll.wait(Some(Duration::from_secs(2))).unwrap(), 1);
        assert!(poll.is_woken());
        assert!(shutdown.is_stopping());
    }
}
