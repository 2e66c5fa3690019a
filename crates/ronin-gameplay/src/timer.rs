//! Countdown/cooldown timers driven by the level clock.
//!
//! A timer never reads a wall clock. The owning entity passes the current
//! simulation time (milliseconds) to [`Timer::activate`] and
//! [`Timer::update`], and must update every timer once per frame before
//! anything reads [`Timer::active`].
//!
//! Two flavours exist:
//! - edge-triggered (default): `active` is true only during the update in
//!   which the elapsed time crosses the duration;
//! - sustained: `active` is true from activation until the duration elapses
//!   or the timer is deactivated.
//!
//! With `repeat` set, an expiring timer immediately re-arms itself, which for
//! an edge-triggered timer yields a periodic one-frame pulse.

use serde::{Deserialize, Serialize};

/// Simulation time in milliseconds.
pub type Millis = u64;

/// A countdown timer with optional repeat and sustained semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    /// Duration in milliseconds
    duration: Millis,
    /// Re-arm on expiry
    repeat: bool,
    /// Level-triggered instead of edge-triggered
    sustained: bool,
    /// Whether the countdown is running
    activated: bool,
    /// Derived output flag
    active: bool,
    /// Time of the last activation
    start_time: Millis,
    /// Elapsed time at the last update
    elapsed: Millis,
}

impl Timer {
    /// Creates an edge-triggered, non-repeating timer.
    #[must_use]
    pub const fn new(duration: Millis) -> Self {
        Self {
            duration,
            repeat: false,
            sustained: false,
            activated: false,
            active: false,
            start_time: 0,
            elapsed: 0,
        }
    }

    /// Makes the timer level-triggered.
    #[must_use]
    pub const fn sustained(mut self) -> Self {
        self.sustained = true;
        self
    }

    /// Makes the timer re-arm itself on expiry.
    #[must_use]
    pub const fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Starts the timer immediately at `now`.
    #[must_use]
    pub fn started(mut self, now: Millis) -> Self {
        self.activate(now);
        self
    }

    /// Starts (or restarts) the countdown at `now`.
    pub fn activate(&mut self, now: Millis) {
        self.activated = true;
        self.start_time = now;
        if self.sustained {
            self.active = true;
        }
    }

    /// Stops the countdown.
    pub fn deactivate(&mut self) {
        self.activated = false;
        if self.sustained {
            self.active = false;
        }
    }

    /// Recomputes the elapsed time and the `active` flag.
    pub fn update(&mut self, now: Millis) {
        if !self.sustained {
            self.active = false;
        }

        self.elapsed = now.saturating_sub(self.start_time);
        if self.activated && self.elapsed >= self.duration {
            self.active = true;

            if self.repeat {
                self.activate(now);
            } else {
                self.deactivate();
            }
        }
    }

    /// Whether the timer currently reports active.
    #[must_use]
    pub const fn active(&self) -> bool {
        self.active
    }

    /// Whether the countdown is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.activated
    }

    /// Configured duration.
    #[must_use]
    pub const fn duration(&self) -> Millis {
        self.duration
    }

    /// Elapsed time observed at the last update.
    #[must_use]
    pub const fn elapsed(&self) -> Millis {
        self.elapsed
    }

    /// Whether the timer is level-triggered.
    #[must_use]
    pub const fn is_sustained(&self) -> bool {
        self.sustained
    }
}
