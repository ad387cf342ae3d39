//! Locally ticking phase countdown.
//!
//! The server owns the clock. The local 1 Hz decrement only interpolates
//! between authoritative pushes, and every push overwrites the local value.

use thiserror::Error;

use crate::protocol::Phase;

/// Snapshot of the countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    pub seconds_remaining: u32,
    pub running: bool,
    /// Phase tag of the last authoritative value.
    pub phase_at_last_sync: Phase,
}

/// A timer broadcast tagged with a phase other than the one the client is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timer update for {got} ignored while in {expected}")]
pub struct StaleTimerUpdate {
    pub expected: Phase,
    pub got: Phase,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countdown {
    state: TimerState,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.state.seconds_remaining
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// One local second elapsed. Returns `true` if the display changed.
    ///
    /// Reaching zero pauses the countdown until the next authoritative value.
    pub fn tick(&mut self) -> bool {
        if !self.state.running {
            return false;
        }
        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
        if self.state.seconds_remaining == 0 {
            self.state.running = false;
        }
        true
    }

    /// Overwrite with an authoritative value. Runs only if `seconds > 0`.
    pub fn sync(&mut self, phase: Phase, seconds: u32) {
        self.state = TimerState {
            seconds_remaining: seconds,
            running: seconds > 0,
            phase_at_last_sync: phase,
        };
    }

    /// Apply a periodic `timer-update` tagged with `tagged`.
    ///
    /// `known` is the phase the client currently believes it is in; an update
    /// for any other phase leaves the countdown untouched.
    pub fn accept_update(
        &mut self,
        known: Phase,
        tagged: Phase,
        seconds: u32,
    ) -> Result<(), StaleTimerUpdate> {
        if known != tagged {
            return Err(StaleTimerUpdate {
                expected: known,
                got: tagged,
            });
        }
        self.sync(tagged, seconds);
        Ok(())
    }

    /// Freeze at zero, e.g. once the game is over.
    pub fn stop(&mut self, phase: Phase) {
        self.sync(phase, 0);
    }
}

/// Render seconds as `m:ss`.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
