//! Clocks and the cancellable debounce timer behind `EntityStore::save`.
//!
//! Nothing here sleeps or spawns. A pending write is a deadline; the host
//! calls `EntityStore::tick` from its event loop (an interval timer in the
//! browser) and the write fires once the deadline has passed.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall clock for native hosts.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// A single replaceable deadline.
///
/// `schedule` cancels any pending deadline and arms a new one `window_ms`
/// after `now`; `fire` reports (once) that the deadline has passed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: u64,
    deadline: Option<u64>,
}

impl Debouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: u64) {
        self.deadline = Some(now.saturating_add(self.window_ms));
    }

    /// Drop the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Milliseconds left before the pending deadline, if any.
    pub fn remaining(&self, now: u64) -> Option<u64> {
        self.deadline.map(|d| d.saturating_sub(now))
    }

    /// Consume the deadline if it has passed.
    pub fn fire(&mut self, now: u64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reschedule_pushes_deadline_back() {
        let mut timer = Debouncer::new(300);
        timer.schedule(0);
        timer.schedule(200);
        assert!(!timer.fire(300));
        assert_eq!(timer.remaining(300), Some(200));
        assert!(timer.fire(500));
        assert!(!timer.fire(600), "fires only once");
    }

    #[test]
    fn cancel_clears_pending() {
        let mut timer = Debouncer::new(10);
        assert!(!timer.cancel());
        timer.schedule(0);
        assert!(timer.cancel());
        assert!(!timer.is_pending());
        assert!(!timer.fire(100));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.advance(250);
        assert_eq!(view.now_ms(), 250);
    }
}
