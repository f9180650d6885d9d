//! Scheduler events — the single stream the presentation layer listens to.
//! The scheduler never talks to widgets; it emits [`SchedulerEvent`]s and a
//! [`PresentationSink`] decides how to show them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Kind of break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Tiny,
    Big,
}

impl std::fmt::Display for BreakKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakKind::Tiny => write!(f, "tiny"),
            BreakKind::Big => write!(f, "big"),
        }
    }
}

/// Everything the scheduler asks the presentation layer to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// Emitted every tick. During a break, seconds left in the break;
    /// otherwise seconds until the next break is due.
    Countdown {
        seconds_remaining: u64,
        until_big_break: u64,
    },
    /// Show the break overlay.
    BreakActivated {
        kind: BreakKind,
        duration_secs: u64,
        ends_at: DateTime<Utc>,
    },
    /// Hide the break overlay.
    BreakDeactivated,
    /// Tray icon fill level, 0 (just rested) to 4 (break due).
    IconLevelChanged { level: u8 },
    BreakSkipped { kind: BreakKind },
    BreakPostponed { kind: BreakKind, retry_in_secs: u64 },
    /// A break is waiting for the user to stop typing.
    /// `seconds` is 0 when the request should be withdrawn.
    RelaxRequested {
        seconds: u64,
        big_break_next: bool,
        flash: bool,
    },
    SuspendedStateChanged { suspended: bool },
    /// Pass-through: the user asked to lock the session.
    LockRequested,
}

/// Receiver of scheduler events, implemented by the GUI layer.
pub trait PresentationSink: Send {
    fn present(&mut self, event: &SchedulerEvent);
}

impl<F> PresentationSink for F
where
    F: FnMut(&SchedulerEvent) + Send,
{
    fn present(&mut self, event: &SchedulerEvent) {
        self(event)
    }
}

/// Sink that only logs. Countdown ticks go to trace level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl PresentationSink for TracingSink {
    fn present(&mut self, event: &SchedulerEvent) {
        match event {
            SchedulerEvent::Countdown { seconds_remaining, until_big_break } => {
                tracing::trace!("⏱️ {seconds_remaining}s remaining ({until_big_break}s until big break)");
            }
            SchedulerEvent::BreakActivated { kind, duration_secs, .. } => {
                tracing::info!("☕ {kind} break started ({duration_secs}s)");
            }
            SchedulerEvent::BreakDeactivated => tracing::info!("💼 Break over, back to work"),
            SchedulerEvent::IconLevelChanged { level } => tracing::debug!("🎚️ Icon level {level}"),
            SchedulerEvent::BreakSkipped { kind } => tracing::info!("⏭️ {kind} break skipped"),
            SchedulerEvent::BreakPostponed { kind, retry_in_secs } => {
                tracing::info!("⏸️ {kind} break postponed for {retry_in_secs}s");
            }
            SchedulerEvent::RelaxRequested { seconds, big_break_next, .. } => {
                if *seconds > 0 {
                    tracing::debug!("🙏 Please relax for {seconds}s (big break next: {big_break_next})");
                }
            }
            SchedulerEvent::SuspendedStateChanged { suspended } => {
                tracing::info!("{} Suspended: {suspended}", if *suspended { "😴" } else { "⏰" });
            }
            SchedulerEvent::LockRequested => tracing::info!("🔒 Lock requested"),
        }
    }
}

/// An event with the time it was published.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedEvent {
    pub event: SchedulerEvent,
    pub timestamp: DateTime<Utc>,
}

/// Broadcast bus — fans events out to any number of subscribers and keeps
/// a short history (ring buffer, max 100) for late joiners.
pub struct EventBus {
    sender: broadcast::Sender<SchedulerEvent>,
    history: Vec<RecordedEvent>,
}

const HISTORY_LIMIT: usize = 100;

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            history: Vec::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a `Stream`.
    pub fn stream(&self) -> BroadcastStream<SchedulerEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Recent events, excluding per-second countdown updates.
    pub fn history(&self) -> &[RecordedEvent] {
        &self.history
    }

    fn record(&mut self, event: &SchedulerEvent) {
        if matches!(event, SchedulerEvent::Countdown { .. }) {
            return;
        }
        self.history.push(RecordedEvent {
            event: event.clone(),
            timestamp: Utc::now(),
        });
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl PresentationSink for EventBus {
    fn present(&mut self, event: &SchedulerEvent) {
        self.record(event);
        // No subscribers is fine; the history still has it.
        let _ = self.sender.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |e: &SchedulerEvent| seen.push(e.clone());
            sink.present(&SchedulerEvent::LockRequested);
        }
        assert_eq!(seen, vec![SchedulerEvent::LockRequested]);
    }

    #[test]
    fn test_history_skips_countdown_and_caps() {
        let mut bus = EventBus::default();
        bus.present(&SchedulerEvent::Countdown { seconds_remaining: 5, until_big_break: 10 });
        assert!(bus.history().is_empty());

        for _ in 0..150 {
            bus.present(&SchedulerEvent::BreakDeactivated);
        }
        assert_eq!(bus.history().len(), 100);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let mut bus = EventBus::default();
        let mut rx = bus.subscribe();
        let mut stream = bus.stream();

        bus.present(&SchedulerEvent::BreakSkipped { kind: BreakKind::Big });

        assert_eq!(rx.recv().await.unwrap(), SchedulerEvent::BreakSkipped { kind: BreakKind::Big });
        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next, SchedulerEvent::BreakSkipped { kind: BreakKind::Big });
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(SchedulerEvent::IconLevelChanged { level: 2 }).unwrap();
        assert_eq!(json["event"], "icon_level_changed");
        assert_eq!(json["level"], 2);
    }
}
