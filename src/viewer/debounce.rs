//! Timers for coalescing bursts of input events.
//!
//! Both types take the current [`Instant`] as an argument instead of reading
//! the clock, so callers drive them from their event loop and tests can step
//! time explicitly.

use std::time::{Duration, Instant};

/// Fires once after `delay` has passed without a new [`poke`](Self::poke).
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Register an event, restarting the quiet period.
    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// True exactly once when the quiet period has elapsed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Time left before the timer fires, if armed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

/// Allows at most one render per `interval`; requests in between are
/// coalesced into a single deferred render.
#[derive(Debug, Clone)]
pub struct RenderThrottle {
    interval: Duration,
    last: Option<Instant>,
    pending: bool,
}

impl RenderThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            pending: false,
        }
    }

    /// Ask for a render.
    pub fn request(&mut self) {
        self.pending = true;
    }

    /// True if a requested render may run now. Marks it done.
    pub fn should_render(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        let ready = self
            .last
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if ready {
            self.pending = false;
            self.last = Some(now);
        }
        ready
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
