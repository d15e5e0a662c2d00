//! Bounded connection gate for the forum client.
//!
//! At most `max_connections` requests run at once. Callers beyond that wait in
//! a queue of at most `max_pending`; a caller that finds the queue full, or
//! that waits longer than `acquire_timeout`, fails with
//! [`Error::Transport`](crate::error::Error::Transport).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::config::PoolConfig;
use crate::error::{Error, Result};

pub struct ConnectionGate {
    permits: Semaphore,
    waiting: AtomicUsize,
    max_pending: usize,
    acquire_timeout: Duration,
}

/// Decrements the waiter count when a queued caller leaves, however it leaves.
struct Waiter<'a>(&'a AtomicUsize);

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConnectionGate {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            permits: Semaphore::new(config.max_connections),
            waiting: AtomicUsize::new(0),
            max_pending: config.max_pending,
            acquire_timeout: config.acquire_timeout(),
        }
    }

    /// Wait for a connection slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        if let Ok(permit) = self.permits.try_acquire() {
            return Ok(permit);
        }

        let queued = self.waiting.fetch_add(1, Ordering::SeqCst) + 1;
        let _waiter = Waiter(&self.waiting);
        if queued > self.max_pending {
            return Err(Error::transport(format!(
                "connection queue full ({} pending)",
                self.max_pending
            )));
        }

        match tokio::time::timeout(self.acquire_timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(Error::transport("connection gate closed")),
            Err(_) => Err(Error::transport(format!(
                "timed out after {:?} waiting for a connection",
                self.acquire_timeout
            ))),
        }
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Callers currently queued for a slot.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn gate(max_connections: usize, max_pending: usize, timeout_ms: u64) -> ConnectionGate {
        let mut gate = ConnectionGate::new(&PoolConfig {
            max_connections,
            max_pending,
            acquire_timeout_secs: 0,
        });
        gate.acquire_timeout = Duration::from_millis(timeout_ms);
        gate
    }

    #[tokio::test]
    async fn permits_released_on_drop() {
        let gate = gate(1, 1, 100);
        let permit = gate.acquire().await.unwrap();
        assert_eq!(gate.available(), 0);
        drop(permit);
        assert_eq!(gate.available(), 1);
        assert!(gate.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn waiter_times_out() {
        let gate = gate(1, 10, 50);
        let _held = gate.acquire().await.unwrap();

        let err = gate.acquire().await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(gate.waiting(), 0);
    }

    #[tokio::test]
    async fn queue_overflow_rejected_immediately() {
        let gate = Arc::new(gate(1, 1, 5_000));
        let held = gate.acquire().await.unwrap();

        let queued = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire().await.map(drop) })
        };
        while gate.waiting() == 0 {
            tokio::task::yield_now().await;
        }

        let err = gate.acquire().await.unwrap_err();
        assert!(err.to_string().contains("queue full"));

        drop(held);
        assert!(queued.await.unwrap().is_ok());
        assert_eq!(gate.waiting(), 0);
    }

    #[tokio::test]
    async fn queued_caller_proceeds_when_slot_frees() {
        let gate = Arc::new(gate(1, 4, 5_000));
        let held = gate.acquire().await.unwrap();

        let queued = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire().await.map(drop) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        assert!(queued.await.unwrap().is_ok());
    }
}
