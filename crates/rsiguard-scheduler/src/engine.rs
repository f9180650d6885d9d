//! Scheduler Engine — the main loop that ticks the scheduler and feeds it user actions.
//! Uses tokio::interval for the 1 Hz tick and a single mpsc queue for user
//! actions, so every mutation of the scheduler happens on one task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::actions::UserAction;
use crate::events::PresentationSink;
use crate::idle::IdleMonitor;
use crate::scheduler::BreakScheduler;
use crate::stats::BreakStats;

/// Default tick period.
pub const TICK: Duration = Duration::from_secs(1);

/// Route one user action to the matching scheduler handler.
pub fn apply_action(scheduler: &mut BreakScheduler, action: UserAction) {
    tracing::debug!("👆 User action: {action:?}");
    match action {
        UserAction::Skip => scheduler.on_user_skip(),
        UserAction::Postpone => scheduler.on_user_postpone(),
        UserAction::Lock => scheduler.on_lock(),
        UserAction::ToggleSuspend => scheduler.toggle_suspend(),
        UserAction::Suspend => scheduler.on_suspend(),
        UserAction::Resume => scheduler.on_resume(),
        UserAction::ForceBreakNow => scheduler.on_force_break_now(),
        UserAction::Reconfigure(config) => scheduler.on_reconfigure(&config),
        UserAction::Quit => {}
    }
}

/// Run the scheduler until `Quit` arrives or every action sender is dropped.
/// Returns the session statistics.
pub async fn run_scheduler<S>(
    mut scheduler: BreakScheduler,
    monitor: Box<dyn IdleMonitor>,
    mut actions: mpsc::Receiver<UserAction>,
    mut sink: S,
    tick: Duration,
) -> BreakStats
where
    S: PresentationSink,
{
    tracing::info!("⏰ Scheduler started (tick every {}ms)", tick.as_millis());
    scheduler.set_idle_detection_available(monitor.is_available());

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; a second has not passed yet.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // A frozen scheduler ignores the reading anyway.
                if !scheduler.is_suspended() {
                    let idle = monitor.idle_seconds();
                    scheduler.set_idle_detection_available(monitor.is_available());
                    scheduler.on_tick(idle);
                }
            }
            action = actions.recv() => match action {
                Some(UserAction::Quit) | None => break,
                Some(action) => apply_action(&mut scheduler, action),
            },
        }

        for event in scheduler.drain_events() {
            sink.present(&event);
        }
    }

    tracing::info!("🛑 Scheduler stopped");
    scheduler.stats().clone()
}

/// Spawn the scheduler loop as a background tokio task.
/// The returned sender is the user action channel.
pub fn spawn_scheduler<S>(
    scheduler: BreakScheduler,
    monitor: Box<dyn IdleMonitor>,
    sink: S,
    tick: Duration,
) -> (mpsc::Sender<UserAction>, JoinHandle<BreakStats>)
where
    S: PresentationSink + 'static,
{
    let (tx, rx) = mpsc::channel(32);
    let handle = tokio::spawn(run_scheduler(scheduler, monitor, rx, sink, tick));
    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BreakKind, EventBus, SchedulerEvent};
    use crate::idle::{ManualIdleMonitor, NullIdleMonitor};
    use rsiguard_core::TimingSettings;
    use std::sync::{Arc, Mutex};

    fn timings() -> TimingSettings {
        TimingSettings {
            tiny_interval: 3,
            tiny_duration: 2,
            big_interval_count: 3,
            big_duration: 4,
            postpone: 5,
            use_idle_detection: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_fires_break_and_quits() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let scheduler = BreakScheduler::with_timings(timings());
        let (tx, handle) = spawn_scheduler(scheduler, Box::new(NullIdleMonitor), bus, TICK);

        loop {
            if let SchedulerEvent::BreakActivated { kind, .. } = rx.recv().await.unwrap() {
                assert_eq!(kind, BreakKind::Tiny);
                break;
            }
        }

        tx.send(UserAction::Skip).await.unwrap();
        loop {
            if let SchedulerEvent::BreakSkipped { kind } = rx.recv().await.unwrap() {
                assert_eq!(kind, BreakKind::Tiny);
                break;
            }
        }

        tx.send(UserAction::Quit).await.unwrap();
        let stats = handle.await.unwrap();
        assert_eq!(stats.tiny_breaks_skipped, 1);
        assert_eq!(stats.tiny_breaks_taken, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_defers_break_for_busy_user() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |e: &SchedulerEvent| seen.lock().unwrap().push(e.clone())
        };
        let monitor = ManualIdleMonitor::new();
        let scheduler = BreakScheduler::with_timings(timings());
        let (tx, handle) = spawn_scheduler(scheduler, Box::new(monitor.clone()), sink, TICK);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        {
            let events = seen.lock().unwrap();
            assert!(events.iter().any(|e| matches!(e, SchedulerEvent::RelaxRequested { .. })));
            assert!(!events.iter().any(|e| matches!(e, SchedulerEvent::BreakActivated { .. })));
        }

        monitor.set(6);
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(tx);
        let stats = handle.await.unwrap();
        assert_eq!(stats.busy_delays, 1);
        assert!(
            seen.lock()
                .unwrap()
                .iter()
                .any(|e| matches!(e, SchedulerEvent::BreakActivated { kind: BreakKind::Tiny, .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_action_freezes_countdown() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let scheduler = BreakScheduler::with_timings(timings());
        let (tx, handle) = spawn_scheduler(scheduler, Box::new(NullIdleMonitor), bus, TICK);

        tx.send(UserAction::ToggleSuspend).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            SchedulerEvent::SuspendedStateChanged { suspended: true }
        );
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());

        tx.send(UserAction::Quit).await.unwrap();
        let stats = handle.await.unwrap();
        assert_eq!(stats.tiny_breaks_taken, 0);
    }

    /// Counts how often the engine asks for a reading.
    #[derive(Clone, Default)]
    struct CountingMonitor(Arc<std::sync::atomic::AtomicU64>);

    impl IdleMonitor for CountingMonitor {
        fn is_available(&self) -> bool {
            true
        }

        fn idle_seconds(&self) -> u64 {
            self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspended_engine_does_not_query_idle() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let monitor = CountingMonitor::default();
        let queries = monitor.0.clone();
        let scheduler = BreakScheduler::with_timings(timings());
        let (tx, handle) = spawn_scheduler(scheduler, Box::new(monitor), bus, TICK);

        tx.send(UserAction::Suspend).await.unwrap();
        loop {
            if rx.recv().await.unwrap() == (SchedulerEvent::SuspendedStateChanged { suspended: true }) {
                break;
            }
        }
        let before = queries.load(std::sync::atomic::Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(queries.load(std::sync::atomic::Ordering::Relaxed), before);

        tx.send(UserAction::Resume).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(queries.load(std::sync::atomic::Ordering::Relaxed) > before);

        tx.send(UserAction::Quit).await.unwrap();
        handle.await.unwrap();
    }
}
