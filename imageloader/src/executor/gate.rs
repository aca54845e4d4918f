//! Concurrency gate bounding in-flight decodes.
//!
//! A semaphore sized to the worker count. The dispatcher acquires a permit
//! before admitting each task and the permit travels with the task into the
//! worker pool. Dropping the permit releases it, so a slot frees up on every
//! exit path of a decode, panics included.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// The gate was closed while waiting for a permit.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("concurrency gate closed")]
pub struct GateClosed;

/// Counting admission control with in-flight instrumentation.
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl ConcurrencyGate {
    /// Creates a gate with `capacity` permits.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits for a permit. Fails only if the gate is closed.
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        Ok(self.track(permit))
    }

    /// Takes a permit if one is free.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        Some(self.track(permit))
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.update_peak(current);
        GatePermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    fn update_peak(&self, current: usize) {
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    /// Closes the gate. Pending and future `acquire` calls fail with
    /// [`GateClosed`]; permits already handed out stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Highest number of permits held at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn reset_peak(&self) {
        self.peak_in_flight.store(0, Ordering::Relaxed);
    }
}

impl fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .field("in_flight", &self.in_flight())
            .field("peak_in_flight", &self.peak_in_flight())
            .finish()
    }
}

/// A held gate slot, released on drop.
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for GatePermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatePermit").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn test_zero_capacity_panics() {
        ConcurrencyGate::new(0);
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let gate = ConcurrencyGate::new(2);
        assert_eq!(gate.available(), 2);

        let p1 = gate.acquire().await.unwrap();
        let p2 = gate.acquire().await.unwrap();
        assert_eq!(gate.available(), 0);
        assert_eq!(gate.in_flight(), 2);
        assert!(gate.try_acquire().is_none());

        drop(p1);
        assert_eq!(gate.available(), 1);
        assert_eq!(gate.in_flight(), 1);

        drop(p2);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.peak_in_flight(), 2);

        gate.reset_peak();
        assert_eq!(gate.peak_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let gate = Arc::new(ConcurrencyGate::new(1));
        let held = gate.acquire().await.unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire().await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let gate = Arc::new(ConcurrencyGate::new(1));
        let _held = gate.try_acquire().unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;

        gate.close();
        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Err(GateClosed));
        assert!(gate.is_closed());
    }

    #[tokio::test]
    async fn test_permit_released_on_panic() {
        let gate = Arc::new(ConcurrencyGate::new(1));
        let permit = gate.acquire().await.unwrap();

        let result = tokio::spawn(async move {
            let _permit = permit;
            panic!("boom");
        })
        .await;

        assert!(result.unwrap_err().is_panic());
        assert_eq!(gate.available(), 1);
        assert_eq!(gate.in_flight(), 0);
    }
}
