//! Per-staff pending request queues.
//!
//! Requests aimed at offline staff wait here in arrival order and are
//! drained FIFO when the target connects. Only request IDs are stored; the
//! coordinator re-checks each request's status at drain time so requests
//! abandoned while waiting are skipped.

use std::collections::{HashMap, VecDeque};

use concierge_core::{RequestId, StaffId};

/// FIFO queues of request IDs keyed by target staff identity.
#[derive(Debug, Default)]
pub struct PendingQueue {
    queues: HashMap<StaffId, VecDeque<RequestId>>,
}

impl PendingQueue {
    /// Create an empty queue set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request to the tail of `staff`'s queue.
    pub fn enqueue(&mut self, staff: StaffId, request: RequestId) {
        self.queues.entry(staff).or_default().push_back(request);
    }

    /// Take the entire queue for `staff`, preserving arrival order.
    pub fn drain(&mut self, staff: &StaffId) -> Vec<RequestId> {
        self.queues
            .remove(staff)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Remove one request from `staff`'s queue wherever it sits.
    /// Returns whether it was present.
    pub fn remove(&mut self, staff: &StaffId, request: &RequestId) -> bool {
        let Some(queue) = self.queues.get_mut(staff) else {
            return false;
        };
        let Some(pos) = queue.iter().position(|id| id == request) else {
            return false;
        };
        queue.remove(pos);
        if queue.is_empty() {
            self.queues.remove(staff);
        }
        true
    }

    /// Number of requests waiting for `staff`.
    #[must_use]
    pub fn len(&self, staff: &StaffId) -> usize {
        self.queues.get(staff).map_or(0, VecDeque::len)
    }

    /// Total number of requests waiting across all staff.
    #[must_use]
    pub fn total(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Whether no requests are waiting for anyone.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(s: &str) -> StaffId {
        StaffId::from(s)
    }

    fn req(s: &str) -> RequestId {
        RequestId::from(s)
    }

    #[test]
    fn drain_preserves_fifo_order() {
        let mut q = PendingQueue::new();
        q.enqueue(staff("ACS"), req("r1"));
        q.enqueue(staff("ACS"), req("r2"));
        q.enqueue(staff("ACS"), req("r3"));
        assert_eq!(q.drain(&staff("ACS")), vec![req("r1"), req("r2"), req("r3")]);
        assert!(q.is_empty());
    }

    #[test]
    fn drain_unknown_staff_is_empty() {
        let mut q = PendingQueue::new();
        assert!(q.drain(&staff("ACS")).is_empty());
    }

    #[test]
    fn queues_are_independent() {
        let mut q = PendingQueue::new();
        q.enqueue(staff("ACS"), req("r1"));
        q.enqueue(staff("BOB"), req("r2"));
        assert_eq!(q.drain(&staff("ACS")), vec![req("r1")]);
        assert_eq!(q.len(&staff("BOB")), 1);
    }

    #[test]
    fn remove_from_middle() {
        let mut q = PendingQueue::new();
        q.enqueue(staff("ACS"), req("r1"));
        q.enqueue(staff("ACS"), req("r2"));
        q.enqueue(staff("ACS"), req("r3"));
        assert!(q.remove(&staff("ACS"), &req("r2")));
        assert_eq!(q.drain(&staff("ACS")), vec![req("r1"), req("r3")]);
    }

    #[test]
    fn remove_missing_request_returns_false() {
        let mut q = PendingQueue::new();
        q.enqueue(staff("ACS"), req("r1"));
        assert!(!q.remove(&staff("ACS"), &req("r9")));
        assert!(!q.remove(&staff("BOB"), &req("r1")));
    }

    #[test]
    fn removing_last_entry_drops_the_queue() {
        let mut q = PendingQueue::new();
        q.enqueue(staff("ACS"), req("r1"));
        assert!(q.remove(&staff("ACS"), &req("r1")));
        assert!(q.is_empty());
        assert_eq!(q.len(&staff("ACS")), 0);
    }
}
