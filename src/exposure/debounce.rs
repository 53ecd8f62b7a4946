//! View-settle debouncing
//!
//! Camera interaction produces a stream of move events. Analysing every
//! intermediate frame is wasted work, so moves are coalesced into a single
//! "view settled" signal once no move has been seen for the quiet period.
//! Timestamps are passed in by the caller, which keeps the debouncer
//! deterministic under test.

use std::time::{Duration, Instant};

/// Coalesces camera moves into one settled signal
#[derive(Debug, Clone)]
pub struct ViewSettleDebouncer {
    quiet_period: Duration,
    last_move: Option<Instant>,
    moving: bool,
}

impl ViewSettleDebouncer {
    /// Create a debouncer firing after `quiet_period` without moves
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            last_move: None,
            moving: false,
        }
    }

    /// Quiet period in effect
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// True between a move start and the settled signal
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Camera started moving
    pub fn move_started(&mut self) {
        self.moving = true;
    }

    /// Camera move finished at `now`; restarts the quiet period
    pub fn move_ended(&mut self, now: Instant) {
        self.last_move = Some(now);
    }

    /// Returns true exactly once per burst, when the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_move {
            Some(last) if now.saturating_duration_since(last) >= self.quiet_period => {
                self.last_move = None;
                self.moving = false;
                true
            }
            _ => false,
        }
    }
}

impl Default for ViewSettleDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}
