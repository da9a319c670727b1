//! Cooperative, cancelable timers.
//!
//! Nothing here reads a real clock. The owner drives a [`Countdown`] with
//! one [`Countdown::tick`] per 100 ms interval and a [`Deferred`] action with
//! the elapsed milliseconds, so expiry and cancellation are deterministic.
//! Each timer is a single-owner value: replacing or dropping it cancels it,
//! and a cancelled timer never fires.
use crate::constants::{TICK_INTERVAL_MS, TIMER_WARNING_SECS};

/// Result of advancing a countdown by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; carries the ticks left.
    Running(u32),
    /// Reached zero on this tick. Reported exactly once.
    Expired,
    /// Cancelled or already expired; nothing happened.
    Inactive,
}

/// Per-question countdown measured in 100 ms ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    active: bool,
}

impl Countdown {
    /// Arm a countdown of `ticks` intervals.
    #[must_use]
    pub const fn start(ticks: u32) -> Self {
        Self {
            remaining: ticks,
            active: true,
        }
    }

    pub fn tick(&mut self) -> Tick {
        if !self.active {
            return Tick::Inactive;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.active = false;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    /// Stop the clock. Has no other effect.
    pub fn cancel(&mut self) {
        self.active = false;
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub const fn remaining_ticks(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn remaining_secs(&self) -> f64 {
        f64::from(self.remaining) * crate::numbers::u64_to_f64(TICK_INTERVAL_MS) / 1_000.0
    }

    /// Whole seconds shown to the learner (rounded up).
    #[must_use]
    pub fn display_secs(&self) -> u32 {
        crate::numbers::ceil_f64_to_u32(self.remaining_secs() - 1e-9)
    }

    /// True once time is nearly up.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.remaining_secs() <= TIMER_WARNING_SECS
    }
}

/// One-shot action fired after a delay, unless cancelled first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred<A> {
    remaining_ms: u64,
    action: Option<A>,
}

impl<A> Deferred<A> {
    #[must_use]
    pub const fn schedule(action: A, delay_ms: u64) -> Self {
        Self {
            remaining_ms: delay_ms,
            action: Some(action),
        }
    }

    /// Let `elapsed_ms` pass; yields the action once the delay is used up.
    pub fn advance(&mut self, elapsed_ms: u64) -> Option<A> {
        self.action.as_ref()?;
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        if self.remaining_ms == 0 {
            self.action.take()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.action = None;
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.action.is_some()
    }
}
