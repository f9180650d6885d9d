//! Break statistics — in-memory only, reset on every launch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::BreakKind;

/// Counters of what happened to breaks this session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakStats {
    pub tiny_breaks_taken: u32,
    pub big_breaks_taken: u32,
    pub tiny_breaks_skipped: u32,
    pub big_breaks_skipped: u32,
    pub breaks_postponed: u32,
    /// Breaks cancelled because the user was already idle long enough.
    pub idle_deferrals: u32,
    /// Breaks delayed because the user was busy typing.
    pub busy_delays: u32,
    pub forced_breaks: u32,
    pub last_tiny_break: Option<DateTime<Utc>>,
    pub last_big_break: Option<DateTime<Utc>>,
}

impl BreakStats {
    pub fn record_taken(&mut self, kind: BreakKind) {
        let now = Utc::now();
        match kind {
            BreakKind::Tiny => {
                self.tiny_breaks_taken += 1;
                self.last_tiny_break = Some(now);
            }
            BreakKind::Big => {
                self.big_breaks_taken += 1;
                self.last_big_break = Some(now);
            }
        }
    }

    pub fn record_skipped(&mut self, kind: BreakKind) {
        match kind {
            BreakKind::Tiny => self.tiny_breaks_skipped += 1,
            BreakKind::Big => self.big_breaks_skipped += 1,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reset() {
        let mut stats = BreakStats::default();
        stats.record_taken(BreakKind::Big);
        stats.record_skipped(BreakKind::Tiny);
        assert_eq!(stats.big_breaks_taken, 1);
        assert!(stats.last_big_break.is_some());
        assert!(stats.last_tiny_break.is_none());
        assert_eq!(stats.tiny_breaks_skipped, 1);

        stats.reset();
        assert_eq!(stats, BreakStats::default());
    }
}
