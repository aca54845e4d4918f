//! One-shot startup gate.
//!
//! Submitters may run before the dispatcher has published its signal
//! channel. They block here until the dispatcher releases the gate, which
//! it does exactly once, right after publishing.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct StartupGate {
    released: Mutex<bool>,
    cond: Condvar,
}

impl StartupGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate and wakes every waiter. Later calls are no-ops.
    pub fn release(&self) {
        let mut released = self.released.lock();
        if !*released {
            *released = true;
            self.cond.notify_all();
        }
    }

    pub fn is_released(&self) -> bool {
        *self.released.lock()
    }

    /// Blocks until released or `timeout` elapses. Returns true if released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut released = self.released.lock();
        if *released {
            return true;
        }
        // wait_while_for re-checks the flag on spurious wakeups.
        self.cond
            .wait_while_for(&mut released, |released| !*released, timeout);
        *released
    }
}
