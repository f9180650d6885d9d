//! Break scheduler — the state machine deciding when the user has to rest.
//!
//! Driven by [`BreakScheduler::on_tick`] once per second plus the user action
//! handlers. Every decision is pushed to an outbox as a [`SchedulerEvent`];
//! callers drain it with [`BreakScheduler::drain_events`].
//!
//! ```text
//! Working ──work timer──▶ evaluate_break
//!    ▲                      ├── idle long enough / bonus ─▶ Working (no break)
//!    │                      ├── user busy ─▶ PendingBreak ──idle > 5s──▶ evaluate (forced)
//!    │                      └── fire ─▶ TinyBreakActive | BigBreakActive
//!    └──── break timer / skip / postpone ◀─────────────────────┘
//! Suspended overlays any state and freezes both timers.
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use rsiguard_core::{BreakConfig, TimingSettings};

use crate::events::{BreakKind, SchedulerEvent};
use crate::stats::BreakStats;
use crate::timer::OneShot;

/// Idle seconds a busy user must reach before a pending break is shown.
pub const ACTIVATION_IDLE_THRESHOLD: u64 = 5;

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Working,
    PendingBreak,
    TinyBreakActive,
    BigBreakActive,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Working,
    Break(BreakKind),
}

/// Everything that must survive a suspend/resume round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub state: SchedulerState,
    pub current_interval: u32,
    pub need_break: bool,
    pub idle_long: bool,
    pub work_remaining: u64,
    pub break_remaining: u64,
}

/// The break scheduling state machine.
pub struct BreakScheduler {
    timings: TimingSettings,
    /// Breaks left before the next big break, `0..=big_interval_count`.
    current_interval: u32,
    need_break: bool,
    idle_long: bool,
    suspended: bool,
    phase: Phase,
    work_timer: OneShot,
    /// Length the work timer was last armed with, for the icon level.
    work_span: u64,
    break_timer: OneShot,
    target_break_end: Option<DateTime<Utc>>,
    countdown_before_break: u32,
    pending_config: Option<TimingSettings>,
    idle_detection_available: bool,
    relax_resets: u32,
    last_relax: u64,
    icon_level: u8,
    stats: BreakStats,
    outbox: Vec<SchedulerEvent>,
}

impl BreakScheduler {
    /// Create a scheduler from user configuration; the first work interval starts now.
    pub fn new(config: &BreakConfig) -> Self {
        Self::with_timings(config.timings())
    }

    pub fn with_timings(timings: TimingSettings) -> Self {
        let mut scheduler = Self {
            timings,
            current_interval: timings.big_interval_count,
            need_break: false,
            idle_long: false,
            suspended: false,
            phase: Phase::Working,
            work_timer: OneShot::default(),
            work_span: timings.tiny_interval,
            break_timer: OneShot::default(),
            target_break_end: None,
            countdown_before_break: timings.big_interval_count,
            pending_config: None,
            idle_detection_available: true,
            relax_resets: 0,
            last_relax: 0,
            icon_level: 0,
            stats: BreakStats::default(),
            outbox: Vec::new(),
        };
        scheduler.restart_work_timer();
        tracing::info!(
            "📅 Scheduler ready: break every {}s ({}s), big break ({}s) every {} breaks",
            timings.tiny_interval,
            timings.tiny_duration,
            timings.big_duration,
            timings.big_interval_count
        );
        scheduler
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn state(&self) -> SchedulerState {
        if self.suspended {
            return SchedulerState::Suspended;
        }
        match self.phase {
            Phase::Break(BreakKind::Tiny) => SchedulerState::TinyBreakActive,
            Phase::Break(BreakKind::Big) => SchedulerState::BigBreakActive,
            Phase::Working if self.need_break => SchedulerState::PendingBreak,
            Phase::Working => SchedulerState::Working,
        }
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state(),
            current_interval: self.current_interval,
            need_break: self.need_break,
            idle_long: self.idle_long,
            work_remaining: self.work_timer.remaining(),
            break_remaining: self.break_timer.remaining(),
        }
    }

    pub fn current_interval(&self) -> u32 {
        self.current_interval
    }

    pub fn need_break_pending(&self) -> bool {
        self.need_break
    }

    pub fn idle_long(&self) -> bool {
        self.idle_long
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn timings(&self) -> &TimingSettings {
        &self.timings
    }

    /// Wall-clock end of the running break (display only).
    pub fn target_break_end(&self) -> Option<DateTime<Utc>> {
        self.target_break_end
    }

    pub fn work_remaining(&self) -> u64 {
        self.work_timer.remaining()
    }

    pub fn break_remaining(&self) -> u64 {
        self.break_timer.remaining()
    }

    pub fn stats(&self) -> &BreakStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Take all events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Kind of the break the next evaluation would fire.
    pub fn next_break_kind(&self) -> BreakKind {
        if self.current_interval <= 1 {
            BreakKind::Big
        } else {
            BreakKind::Tiny
        }
    }

    /// Tell the scheduler whether idle readings can be trusted.
    /// Without them breaks simply follow the clock.
    pub fn set_idle_detection_available(&mut self, available: bool) {
        if self.idle_detection_available != available {
            tracing::info!("🖱️ Idle detection available: {available}");
        }
        self.idle_detection_available = available;
    }

    fn idle_aware(&self) -> bool {
        self.timings.use_idle_detection && self.idle_detection_available
    }

    // ── Tick ────────────────────────────────────────────────

    /// Advance one second. `idle_seconds` is the latest idle reading.
    pub fn on_tick(&mut self, idle_seconds: u64) {
        if self.suspended {
            return;
        }
        let idle = if self.idle_aware() { idle_seconds } else { 0 };

        match self.phase {
            Phase::Break(kind) => {
                if self.break_timer.tick() {
                    self.finish_break(kind);
                }
            }
            Phase::Working if self.need_break => {
                // Losing idle detection while pending must not strand the break.
                if !self.idle_aware() || idle > ACTIVATION_IDLE_THRESHOLD {
                    self.evaluate_break(true, idle);
                } else {
                    self.request_relax(idle);
                }
            }
            Phase::Working => {
                if self.work_timer.tick() {
                    self.evaluate_break(false, idle);
                }
            }
        }

        self.emit_display();
    }

    /// Decide whether the elapsed work interval turns into a break.
    fn evaluate_break(&mut self, forced: bool, total_idle: u64) {
        let before = self.current_interval;
        if self.current_interval > 0 {
            self.current_interval -= 1;
        }
        self.need_break = false;
        self.clear_relax();
        self.work_timer.cancel();

        let min_needed = if self.current_interval == 0 {
            self.timings.big_duration
        } else {
            self.timings.tiny_duration
        };

        tracing::debug!(
            "Big break in {}; idle {}s; needed {}s; forced: {}; idle long: {}",
            self.current_interval,
            total_idle,
            min_needed,
            forced,
            self.idle_long
        );

        if !forced && self.idle_aware() {
            // The user already rested as long as the break would last.
            if total_idle >= min_needed {
                tracing::debug!("No break needed");
                self.idle_long = false;
                self.refund();
                // Idle for a whole interval earns one more break off.
                if total_idle >= self.timings.tiny_interval {
                    tracing::debug!("Next break will be delayed, idle for a while now");
                    self.idle_long = true;
                    self.refund();
                }
                self.stats.idle_deferrals += 1;
                self.restart_work_timer();
                return;
            }

            if self.idle_long {
                tracing::debug!("Break delayed, idle for a while recently");
                self.refund();
                self.idle_long = false;
                self.stats.idle_deferrals += 1;
                self.restart_work_timer();
                return;
            }

            if total_idle < ACTIVATION_IDLE_THRESHOLD {
                tracing::debug!(
                    "User seems busy, waiting for {}s of inactivity",
                    ACTIVATION_IDLE_THRESHOLD
                );
                self.refund();
                self.need_break = true;
                self.stats.busy_delays += 1;
                self.request_relax(total_idle);
                return;
            }
        }

        let kind = if self.current_interval > 0 {
            BreakKind::Tiny
        } else {
            self.current_interval = self.timings.big_interval_count;
            BreakKind::Big
        };
        self.start_break(kind, before);
    }

    fn refund(&mut self) {
        if self.current_interval < self.timings.big_interval_count {
            self.current_interval += 1;
        }
    }

    fn start_break(&mut self, kind: BreakKind, countdown_before: u32) {
        let duration = match kind {
            BreakKind::Tiny => self.timings.tiny_duration,
            BreakKind::Big => self.timings.big_duration,
        };
        self.countdown_before_break = countdown_before;
        self.phase = Phase::Break(kind);
        self.break_timer.start(duration);
        let ends_at = break_end(duration);
        self.target_break_end = Some(ends_at);
        tracing::info!("☕ {kind} break for {duration}s");
        self.emit(SchedulerEvent::BreakActivated {
            kind,
            duration_secs: duration,
            ends_at,
        });
    }

    /// Break timer ran out: the break counts as taken.
    fn finish_break(&mut self, kind: BreakKind) {
        self.leave_break();
        self.stats.record_taken(kind);
        self.apply_pending_config();
        self.restart_work_timer();
    }

    fn leave_break(&mut self) {
        self.break_timer.cancel();
        self.phase = Phase::Working;
        self.target_break_end = None;
        self.emit(SchedulerEvent::BreakDeactivated);
    }

    fn restart_work_timer(&mut self) {
        self.start_work_timer(self.timings.tiny_interval);
    }

    fn start_work_timer(&mut self, secs: u64) {
        self.work_timer.start(secs);
        self.work_span = secs.max(1);
    }

    // ── Relax requests ──────────────────────────────────────

    fn request_relax(&mut self, idle: u64) {
        let seconds = (ACTIVATION_IDLE_THRESHOLD + 1).saturating_sub(idle).max(1);
        let mut flash = false;
        // A higher value than last time means the user typed again.
        if seconds >= self.last_relax {
            self.relax_resets = self.relax_resets.wrapping_add(1);
            flash = seconds > self.last_relax || self.relax_resets % 4 == 0;
        }
        self.last_relax = seconds;
        self.emit(SchedulerEvent::RelaxRequested {
            seconds,
            big_break_next: self.next_break_kind() == BreakKind::Big,
            flash,
        });
    }

    fn clear_relax(&mut self) {
        if self.last_relax > 0 {
            self.emit(SchedulerEvent::RelaxRequested {
                seconds: 0,
                big_break_next: self.next_break_kind() == BreakKind::Big,
                flash: false,
            });
        }
        self.last_relax = 0;
        self.relax_resets = 0;
    }

    // ── User actions ────────────────────────────────────────

    /// End the running (or pending) break without resting.
    pub fn on_user_skip(&mut self) {
        if self.suspended {
            tracing::debug!("Skip ignored while suspended");
            return;
        }
        let kind = match self.phase {
            Phase::Break(kind) => {
                self.leave_break();
                self.apply_pending_config();
                kind
            }
            Phase::Working if self.need_break => {
                self.need_break = false;
                self.clear_relax();
                self.next_break_kind()
            }
            Phase::Working => {
                tracing::debug!("Skip ignored, no break to skip");
                return;
            }
        };
        self.stats.record_skipped(kind);
        self.emit(SchedulerEvent::BreakSkipped { kind });
        self.restart_work_timer();
    }

    /// End the running (or pending) break and offer it again after the
    /// postpone delay. The countdown is not consumed.
    pub fn on_user_postpone(&mut self) {
        if self.suspended {
            tracing::debug!("Postpone ignored while suspended");
            return;
        }
        let kind = match self.phase {
            Phase::Break(kind) => {
                self.leave_break();
                self.current_interval = self.countdown_before_break;
                self.apply_pending_config();
                kind
            }
            Phase::Working if self.need_break => {
                // Already refunded when the break went pending.
                self.need_break = false;
                self.clear_relax();
                self.next_break_kind()
            }
            Phase::Working => {
                tracing::debug!("Postpone ignored, no break to postpone");
                return;
            }
        };
        let retry_in_secs = self.timings.postpone;
        self.stats.breaks_postponed += 1;
        self.emit(SchedulerEvent::BreakPostponed { kind, retry_in_secs });
        self.start_work_timer(retry_in_secs);
    }

    /// Start a break right now, whatever the idle state.
    pub fn on_force_break_now(&mut self) {
        if self.suspended {
            tracing::debug!("Forced break ignored while suspended");
            return;
        }
        if let Phase::Break(kind) = self.phase {
            tracing::debug!("Forced break ignored, {kind} break already running");
            return;
        }
        self.stats.forced_breaks += 1;
        self.evaluate_break(true, 0);
        self.emit_display();
    }

    pub fn on_lock(&mut self) {
        self.emit(SchedulerEvent::LockRequested);
    }

    /// Freeze scheduling. Calling it twice is the same as once.
    pub fn on_suspend(&mut self) {
        if self.suspended {
            return;
        }
        self.suspended = true;
        tracing::info!("😴 Scheduler suspended");
        if matches!(self.phase, Phase::Break(_)) {
            // Hidden, not finished: the break timer keeps its remaining time.
            self.emit(SchedulerEvent::BreakDeactivated);
        }
        self.emit(SchedulerEvent::SuspendedStateChanged { suspended: true });
    }

    /// Unfreeze scheduling; a hidden break is shown again.
    pub fn on_resume(&mut self) {
        if !self.suspended {
            return;
        }
        self.suspended = false;
        tracing::info!("⏰ Scheduler resumed");
        self.emit(SchedulerEvent::SuspendedStateChanged { suspended: false });
        if let Phase::Break(kind) = self.phase {
            let duration = self.break_timer.remaining();
            let ends_at = break_end(duration);
            self.target_break_end = Some(ends_at);
            self.emit(SchedulerEvent::BreakActivated {
                kind,
                duration_secs: duration,
                ends_at,
            });
        }
    }

    pub fn toggle_suspend(&mut self) {
        if self.suspended {
            self.on_resume();
        } else {
            self.on_suspend();
        }
    }

    /// Apply new timings. During a break they wait for the break to end.
    pub fn on_reconfigure(&mut self, config: &BreakConfig) {
        let timings = config.timings();
        if matches!(self.phase, Phase::Break(_)) {
            tracing::info!("⚙️ Reconfigured during a break, applying when it ends");
            self.pending_config = Some(timings);
            return;
        }
        self.apply_timings(timings);
        if !self.need_break {
            self.restart_work_timer();
        }
    }

    fn apply_pending_config(&mut self) {
        if let Some(timings) = self.pending_config.take() {
            self.apply_timings(timings);
        }
    }

    fn apply_timings(&mut self, timings: TimingSettings) {
        if timings.big_interval_count != self.timings.big_interval_count {
            self.current_interval = self.current_interval.min(timings.big_interval_count);
            self.countdown_before_break =
                self.countdown_before_break.min(timings.big_interval_count);
        }
        self.timings = timings;
        tracing::info!("⚙️ Timings updated: {:?}", self.timings);
    }

    // ── Display ─────────────────────────────────────────────

    fn emit(&mut self, event: SchedulerEvent) {
        self.outbox.push(event);
    }

    fn emit_display(&mut self) {
        let seconds_remaining = match self.phase {
            Phase::Break(_) => self.break_timer.remaining(),
            Phase::Working => self.work_timer.remaining(),
        };
        let until_big_break = self.until_big_break();
        self.emit(SchedulerEvent::Countdown {
            seconds_remaining,
            until_big_break,
        });

        let level = self.icon_level();
        if level != self.icon_level {
            self.icon_level = level;
            self.emit(SchedulerEvent::IconLevelChanged { level });
        }
    }

    /// Rough seconds until the next big break, assuming no idle deferrals.
    fn until_big_break(&self) -> u64 {
        let t = &self.timings;
        let cycle = t.tiny_interval.saturating_add(t.tiny_duration);
        let evaluations = u64::from(self.current_interval.max(1));
        match self.phase {
            Phase::Break(BreakKind::Big) => 0,
            Phase::Break(BreakKind::Tiny) => {
                let rest = (evaluations - 1).saturating_mul(cycle);
                self.break_timer
                    .remaining()
                    .saturating_add(t.tiny_interval)
                    .saturating_add(rest)
            }
            Phase::Working => self
                .work_timer
                .remaining()
                .saturating_add((evaluations - 1).saturating_mul(cycle)),
        }
    }

    /// 0..=4: how far into the work interval the user is. 4 means break time.
    fn icon_level(&self) -> u8 {
        match self.phase {
            Phase::Break(_) => 4,
            Phase::Working if self.need_break || !self.work_timer.is_pending() => 4,
            Phase::Working => {
                let elapsed = self.work_span.saturating_sub(self.work_timer.remaining());
                (elapsed.saturating_mul(4) / self.work_span).min(4) as u8
            }
        }
    }
}

/// Wall-clock end of a break starting now. Saturates instead of overflowing.
fn break_end(duration_secs: u64) -> DateTime<Utc> {
    let now = Utc::now();
    i64::try_from(duration_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
