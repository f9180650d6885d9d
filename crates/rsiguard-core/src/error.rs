//! Error types for RsiGuard.

/// Errors raised at the edges of RsiGuard (config files, platform probes).
///
/// The scheduler itself never returns these: bad input is clamped and
/// missing capabilities degrade silently.
#[derive(Debug, thiserror::Error)]
pub enum RsiError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Idle detection unavailable: {0}")]
    IdleUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RsiError>;
