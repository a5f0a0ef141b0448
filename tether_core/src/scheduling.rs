// tether_core/src/scheduling.rs

//! Cancellable single-shot deferred actions, driven by the host's clock.
//!
//! Nothing here runs on its own thread. The owner calls [`DeferredQueue::drain_due`]
//! from its per-frame tick, so an action can only fire on the synchronized context
//! and never after it has been cancelled.

/// Handle to a scheduled action. Handles are never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeferredHandle(u64);

#[derive(Debug)]
struct Pending<A> {
    handle: DeferredHandle,
    deadline: f64,
    action: A,
}

#[derive(Debug)]
pub struct DeferredQueue<A> {
    next_id: u64,
    pending: Vec<Pending<A>>,
}

impl<A> Default for DeferredQueue<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<A> DeferredQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` to become due `delay` seconds after `now`.
    pub fn schedule(&mut self, now: f64, delay: f64, action: A) -> DeferredHandle {
        let handle = DeferredHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            deadline: now + delay.max(0.0),
            action,
        });
        handle
    }

    /// Cancels a pending action. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: DeferredHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: DeferredHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    /// Removes and returns every action whose deadline is at or before `now`,
    /// earliest first. Each action is delivered exactly once.
    pub fn drain_due(&mut self, now: f64) -> Vec<A> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].deadline <= now {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.deadline.total_cmp(&b.deadline));
        due.into_iter().map(|p| p.action).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_fire_once_in_deadline_order() {
        let mut queue = DeferredQueue::new();
        queue.schedule(0.0, 2.0, "late");
        queue.schedule(0.0, 1.0, "early");
        assert!(queue.drain_due(0.5).is_empty());
        assert_eq!(queue.drain_due(2.0), vec!["early", "late"]);
        assert!(queue.drain_due(10.0).is_empty());
    }

    #[test]
    fn cancelled_actions_never_fire() {
        let mut queue = DeferredQueue::new();
        let handle = queue.schedule(0.0, 1.0, ());
        assert!(queue.is_pending(handle));
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert!(queue.drain_due(5.0).is_empty());
    }

    #[test]
    fn handles_are_not_reused() {
        let mut queue = DeferredQueue::new();
        let a = queue.schedule(0.0, 1.0, 1);
        queue.drain_due(1.0);
        let b = queue.schedule(1.0, 1.0, 2);
        assert_ne!(a, b);
        assert!(!queue.is_pending(a));
    }
}
