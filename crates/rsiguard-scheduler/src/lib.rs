//! # RsiGuard Scheduler
//!
//! Break scheduling for the RsiGuard reminder: decides when the user has to
//! rest and tells the presentation layer what to show.
//!
//! ## Design Principles
//! - One state machine, no widgets — output is a single event stream
//! - Tick-driven one-shot timers — deterministic and testable
//! - Idle detection is optional — without it breaks follow the clock
//! - Everything runs on one task; user actions are queued between ticks
//!
//! ## Architecture
//! ```text
//! Engine (tokio interval, 1 Hz)
//!   ├── IdleMonitor: seconds since last input
//!   ├── UserAction queue: skip, postpone, suspend, break now, reconfigure
//!   └── BreakScheduler.on_tick(idle)
//!         └── SchedulerEvent → PresentationSink
//!                               ├── EventBus (broadcast + history)
//!                               ├── TracingSink (logs)
//!                               └── GUI (tray, overlay)
//! ```

pub mod actions;
pub mod engine;
pub mod events;
pub mod idle;
pub mod scheduler;
pub mod stats;
pub mod timer;

pub use actions::UserAction;
pub use engine::{TICK, apply_action, run_scheduler, spawn_scheduler};
pub use events::{BreakKind, EventBus, PresentationSink, RecordedEvent, SchedulerEvent, TracingSink};
pub use idle::{CommandIdleMonitor, IdleMonitor, ManualIdleMonitor, NullIdleMonitor};
pub use scheduler::{ACTIVATION_IDLE_THRESHOLD, BreakScheduler, SchedulerSnapshot, SchedulerState};
pub use stats::BreakStats;
pub use timer::OneShot;
