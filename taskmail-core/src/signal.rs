//! Wake-up signal for signal-driven tasks
//!
//! A task that only runs when work arrives parks on a `WakeSignal` and has
//! its mailbox raise the signal after every successful enqueue. The flag is
//! atomic: raising an already raised signal is a single swap. Only the
//! raise that sets the flag takes the internal lock, briefly, to notify a
//! parked waiter, so it can contend with the owner for that instant.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Binary wake-up signal
#[derive(Debug, Default)]
pub struct WakeSignal {
    raised: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake one waiter
    pub fn raise(&self) {
        if self.raised.swap(true, Ordering::AcqRel) {
            return;
        }
        // Waiters check the flag under the lock, so the notify cannot be lost
        let _guard = self.lock.lock();
        self.condvar.notify_one();
    }

    /// Wait until raised, then clear the signal
    pub fn wait(&self) {
        let mut guard = self.lock.lock();
        while !self.raised.swap(false, Ordering::AcqRel) {
            self.condvar.wait(&mut guard);
        }
    }

    /// Wait at most `timeout`. Returns true if the signal was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.raised.swap(false, Ordering::AcqRel) {
            return true;
        }
        let mut guard = self.lock.lock();
        if !self.raised.load(Ordering::Acquire) {
            self.condvar.wait_for(&mut guard, timeout);
        }
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Whether the signal is currently raised
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
