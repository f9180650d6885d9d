//! # RsiGuard Core
//!
//! Shared configuration and error types for the RsiGuard break reminder.

pub mod config;
pub mod error;

pub use config::{BreakConfig, IdleConfig, MAX_DURATION_SECS, RsiConfig, TimingSettings};
pub use error::{Result, RsiError};
