//! # RsiGuard — break reminder daemon
//!
//! Runs the break scheduler in the terminal. Break events are logged (or
//! printed as JSON lines for a GUI front end to consume) and user actions
//! are read from stdin, one command per line.
//!
//! Usage:
//!   rsiguard                          # Default config (~/.rsiguard/config.toml)
//!   rsiguard --config ./rsi.toml      # Custom config
//!   rsiguard --json                   # Emit events as JSON lines on stdout
//!   rsiguard --init-config            # Write the default config and exit
//!
//! Commands: skip, postpone, lock, toggle, pause, resume, break, reload, quit

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rsiguard_core::RsiConfig;
use rsiguard_scheduler::{
    BreakScheduler, IdleMonitor, NullIdleMonitor, PresentationSink, SchedulerEvent, TracingSink,
    UserAction, idle, spawn_scheduler,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rsiguard",
    version,
    about = "⏰ RsiGuard — take your breaks, keep your wrists"
)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "~/.rsiguard/config.toml")]
    config: String,

    /// Ignore idle detection; breaks follow the clock
    #[arg(long)]
    no_idle: bool,

    /// Print scheduler events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Tick period in milliseconds (1000 = real time)
    #[arg(long, default_value = "1000")]
    tick_ms: u64,

    /// Write the default config to --config and exit
    #[arg(long)]
    init_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

fn load_config(path: &Path) -> Result<RsiConfig> {
    if path.exists() {
        Ok(RsiConfig::load_from(path)?)
    } else {
        tracing::info!("📄 No config at {}, using defaults", path.display());
        Ok(RsiConfig::default())
    }
}

/// Read commands from stdin and forward them to the scheduler.
async fn read_commands(tx: mpsc::Sender<UserAction>, config_path: PathBuf) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("⚠️ Failed to read stdin: {e}");
                break;
            }
        };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        let action = if command.eq_ignore_ascii_case("reload") {
            match load_config(&config_path) {
                Ok(config) => UserAction::Reconfigure(config.breaks),
                Err(e) => {
                    tracing::warn!("⚠️ Reload failed: {e}");
                    continue;
                }
            }
        } else {
            match UserAction::parse(command) {
                Some(action) => action,
                None => {
                    tracing::warn!("❓ Unknown command '{command}'");
                    continue;
                }
            }
        };

        let quit = action == UserAction::Quit;
        if tx.send(action).await.is_err() || quit {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "rsiguard=debug,rsiguard_scheduler=debug,rsiguard_core=debug"
    } else {
        "rsiguard=info,rsiguard_scheduler=info,rsiguard_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = expand_path(&cli.config);

    // --init-config: write defaults and exit
    if cli.init_config {
        RsiConfig::default().save_to(&config_path)?;
        println!("✅ Default config written to {}", config_path.display());
        return Ok(());
    }

    let config = load_config(&config_path)?;

    let monitor: Box<dyn IdleMonitor> = if cli.no_idle || !config.breaks.use_idle_detection {
        tracing::info!("🖱️ Idle detection off, breaks follow the clock");
        Box::new(NullIdleMonitor)
    } else {
        idle::detect(&config.idle).await
    };

    let json = cli.json;
    let mut log = TracingSink;
    let sink = move |event: &SchedulerEvent| {
        log.present(event);
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("⚠️ Failed to serialize event: {e}"),
            }
        }
    };

    let scheduler = BreakScheduler::new(&config.breaks);
    let tick = Duration::from_millis(cli.tick_ms.max(1));
    let (tx, handle) = spawn_scheduler(scheduler, monitor, sink, tick);

    tokio::spawn(read_commands(tx.clone(), config_path));

    let ctrl_tx = tx;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_tx.send(UserAction::Quit).await.ok();
        }
    });

    let stats = handle.await?;
    tracing::info!(
        "📊 Session: {} tiny, {} big breaks taken; {} skipped; {} postponed",
        stats.tiny_breaks_taken,
        stats.big_breaks_taken,
        stats.tiny_breaks_skipped + stats.big_breaks_skipped,
        stats.breaks_postponed
    );
    if json {
        println!("{}", serde_json::to_string(&serde_json::json!({ "event": "session_stats", "stats": stats }))?);
    }

    Ok(())
}
