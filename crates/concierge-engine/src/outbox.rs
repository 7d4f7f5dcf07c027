//! Delivery seam between the engine and the transport.
//!
//! The coordinator computes its effects under its state lock, then hands
//! them to an [`Outbox`] after the lock is released. Implementations must
//! not block: the transport backs this with bounded per-connection channels
//! and drops on overflow, so `deliver` is fire-and-forget by contract.

use std::sync::Arc;

use parking_lot::Mutex;

use concierge_core::{ConnectionId, Outbound};

/// Sink for server-pushed events.
pub trait Outbox: Send + Sync {
    /// Deliver an event to one connection. Must not block.
    fn deliver(&self, target: &ConnectionId, event: Outbound);

    /// Deliver an event to every live connection. Must not block.
    fn broadcast(&self, event: Outbound);
}

/// Recording outbox for tests.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    inner: Mutex<Recorded>,
}

#[derive(Debug, Default)]
struct Recorded {
    deliveries: Vec<(ConnectionId, Outbound)>,
    broadcasts: Vec<Outbound>,
}

impl MemoryOutbox {
    /// Create an empty recording outbox.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything delivered so far, in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<(ConnectionId, Outbound)> {
        self.inner.lock().deliveries.clone()
    }

    /// Events delivered to one connection, in order.
    #[must_use]
    pub fn delivered_to(&self, target: &ConnectionId) -> Vec<Outbound> {
        self.inner
            .lock()
            .deliveries
            .iter()
            .filter(|(t, _)| t == target)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Everything broadcast so far, in order.
    #[must_use]
    pub fn broadcasts(&self) -> Vec<Outbound> {
        self.inner.lock().broadcasts.clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.deliveries.clear();
        inner.broadcasts.clear();
    }
}

impl Outbox for MemoryOutbox {
    fn deliver(&self, target: &ConnectionId, event: Outbound) {
        self.inner.lock().deliveries.push((target.clone(), event));
    }

    fn broadcast(&self, event: Outbound) {
        self.inner.lock().broadcasts.push(event);
    }
}
