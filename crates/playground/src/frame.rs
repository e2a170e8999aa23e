//! Frame scheduling
//!
//! Work that should happen "on the next frame" is parked in a [`FrameSlot`].
//! A slot holds at most one pending task: scheduling again cancels the
//! earlier one, so a burst of input inside one frame interval collapses to
//! the latest request. The event loop consults a [`FrameClock`] to decide
//! when frames fire.

use std::time::{Duration, Instant};

/// Identity of one scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

#[derive(Debug)]
pub struct FrameSlot<T> {
    pending: Option<(FrameToken, T)>,
    next_token: u64,
    scheduled: u64,
    cancelled: u64,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            pending: None,
            next_token: 0,
            scheduled: 0,
            cancelled: 0,
        }
    }

    /// Park `payload` for the next frame, replacing anything still pending
    pub fn schedule(&mut self, payload: T) -> FrameToken {
        self.cancel();
        let token = FrameToken(self.next_token);
        self.next_token += 1;
        self.scheduled += 1;
        self.pending = Some((token, payload));
        token
    }

    /// Drop the pending task. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        if self.pending.take().is_some() {
            self.cancelled += 1;
            true
        } else {
            false
        }
    }

    /// Fire the pending task, if any
    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_token(&self) -> Option<FrameToken> {
        self.pending.as_ref().map(|(token, _)| *token)
    }

    /// Total tasks ever scheduled
    pub fn scheduled_count(&self) -> u64 {
        self.scheduled
    }

    /// Tasks dropped before they fired
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}

/// Fixed-cadence frame timer
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The first frame is due immediately
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// How long the event loop may block before the next frame
    pub fn time_until_next(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => (last + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    pub fn advance(&mut self, now: Instant) {
        self.last = Some(now);
    }
}
