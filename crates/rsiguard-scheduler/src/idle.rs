//! Idle detection — how long since the user last touched keyboard or mouse.
//!
//! Queries run inline on every tick, so implementations must stay cheap:
//! anything slow (like spawning a probe process) happens on a background task.
//! A platform without idle detection reports itself unavailable and the
//! scheduler falls back to plain interval breaks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use rsiguard_core::{IdleConfig, Result, RsiError};

/// Source of "seconds since last input" readings.
pub trait IdleMonitor: Send {
    /// Whether this monitor can actually observe user input.
    fn is_available(&self) -> bool;

    /// Seconds idle since the last input event. 0 when unknown.
    fn idle_seconds(&self) -> u64;
}

/// Monitor for platforms without idle detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIdleMonitor;

impl IdleMonitor for NullIdleMonitor {
    fn is_available(&self) -> bool {
        false
    }

    fn idle_seconds(&self) -> u64 {
        0
    }
}

/// Settable monitor, shared between clones. Used by tests and simulations.
#[derive(Debug, Clone, Default)]
pub struct ManualIdleMonitor {
    idle: Arc<AtomicU64>,
}

impl ManualIdleMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: u64) {
        self.idle.store(secs, Ordering::Relaxed);
    }
}

impl IdleMonitor for ManualIdleMonitor {
    fn is_available(&self) -> bool {
        true
    }

    fn idle_seconds(&self) -> u64 {
        self.idle.load(Ordering::Relaxed)
    }
}

/// Longest a single probe run may take before it counts as a failure.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// How often the background task refreshes the reading.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Monitor backed by an external probe printing idle milliseconds
/// (`xprintidle` on X11 by default).
///
/// The probe runs on its own tokio task; readers only load the latest value.
/// Any failure or timeout stops polling and marks the monitor unavailable.
#[derive(Debug)]
pub struct CommandIdleMonitor {
    idle: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
    poller: JoinHandle<()>,
}

impl CommandIdleMonitor {
    /// Run the probe once, then keep polling it in the background.
    /// Fails if the first run cannot produce a reading.
    pub async fn spawn(config: &IdleConfig) -> Result<Self> {
        Self::spawn_with(config, PROBE_TIMEOUT, PROBE_INTERVAL).await
    }

    pub async fn spawn_with(config: &IdleConfig, timeout: Duration, every: Duration) -> Result<Self> {
        let probe = Probe {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout,
        };
        let ms = probe.query_ms().await?;
        tracing::info!("🖱️ Idle detection via '{}' ({}s idle)", probe.command, ms / 1000);

        let idle = Arc::new(AtomicU64::new(ms / 1000));
        let available = Arc::new(AtomicBool::new(true));
        let poller = tokio::spawn(poll(probe, every, idle.clone(), available.clone()));
        Ok(Self { idle, available, poller })
    }
}

impl Drop for CommandIdleMonitor {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

impl IdleMonitor for CommandIdleMonitor {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn idle_seconds(&self) -> u64 {
        if !self.is_available() {
            return 0;
        }
        self.idle.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct Probe {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Probe {
    async fn query_ms(&self) -> Result<u64> {
        let run = tokio::time::timeout(
            self.timeout,
            Command::new(&self.command)
                .args(&self.args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let output = match run {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(RsiError::IdleUnavailable(format!("{}: {e}", self.command))),
            Err(_) => {
                return Err(RsiError::IdleUnavailable(format!(
                    "{} timed out after {}ms",
                    self.command,
                    self.timeout.as_millis()
                )));
            }
        };
        if !output.status.success() {
            return Err(RsiError::IdleUnavailable(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }
        parse_millis(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| RsiError::IdleUnavailable(format!("{}: unparsable output", self.command)))
    }
}

async fn poll(probe: Probe, every: Duration, idle: Arc<AtomicU64>, available: Arc<AtomicBool>) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;
    loop {
        interval.tick().await;
        match probe.query_ms().await {
            Ok(ms) => idle.store(ms / 1000, Ordering::Relaxed),
            Err(e) => {
                // Degrade for the rest of the session; warn only once.
                available.store(false, Ordering::Relaxed);
                idle.store(0, Ordering::Relaxed);
                tracing::warn!("⚠️ Idle detection lost, breaks will follow the clock: {e}");
                return;
            }
        }
    }
}

fn parse_millis(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

/// Pick the best monitor for this machine, falling back to [`NullIdleMonitor`].
pub async fn detect(config: &IdleConfig) -> Box<dyn IdleMonitor> {
    match CommandIdleMonitor::spawn(config).await {
        Ok(monitor) => Box::new(monitor),
        Err(e) => {
            tracing::warn!("⚠️ {e}; idle detection disabled");
            Box::new(NullIdleMonitor)
        }
    }
}
