//! Single-shot countdown timers driven by the scheduler tick.
//! Starting a timer replaces whatever was pending, so at most one instance runs.

/// A single-shot timer measured in ticks (seconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShot {
    remaining: Option<u64>,
}

impl OneShot {
    /// Arm the timer, cancelling any pending run.
    pub fn start(&mut self, secs: u64) {
        self.remaining = Some(secs.max(1));
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn is_pending(&self) -> bool {
        self.remaining.is_some()
    }

    /// Seconds until the timer fires, 0 when idle.
    pub fn remaining(&self) -> u64 {
        self.remaining.unwrap_or(0)
    }

    /// Advance one second. Returns true exactly once, on the tick the timer fires.
    pub fn tick(&mut self) -> bool {
        match self.remaining {
            Some(left) if left <= 1 => {
                self.remaining = None;
                true
            }
            Some(left) => {
                self.remaining = Some(left - 1);
                false
            }
            None => false,
        }
    }
}
