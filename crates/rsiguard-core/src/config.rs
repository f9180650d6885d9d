//! RsiGuard configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, RsiError};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RsiConfig {
    #[serde(default)]
    pub breaks: BreakConfig,
    #[serde(default)]
    pub idle: IdleConfig,
}

impl RsiConfig {
    /// Load config from the default path (~/.rsiguard/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RsiError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RsiError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RsiError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the RsiGuard home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rsiguard")
    }
}

/// Break timing as the user configures it (minutes where a human thinks in minutes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakConfig {
    /// Work time between two breaks.
    #[serde(default = "default_tiny_interval_minutes")]
    pub tiny_interval_minutes: f64,
    #[serde(default = "default_tiny_duration_seconds")]
    pub tiny_duration_seconds: i64,
    /// Number of breaks counted down before a big break.
    #[serde(default = "default_big_interval_count")]
    pub big_interval_count: i64,
    #[serde(default = "default_big_duration_minutes")]
    pub big_duration_minutes: f64,
    /// Delay before a postponed break is offered again.
    #[serde(default = "default_postpone_minutes")]
    pub postpone_minutes: f64,
    #[serde(default = "bool_true")]
    pub use_idle_detection: bool,
}

fn default_tiny_interval_minutes() -> f64 { 10.0 }
fn default_tiny_duration_seconds() -> i64 { 20 }
fn default_big_interval_count() -> i64 { 3 }
fn default_big_duration_minutes() -> f64 { 1.0 }
fn default_postpone_minutes() -> f64 { 5.0 }
fn bool_true() -> bool { true }

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            tiny_interval_minutes: default_tiny_interval_minutes(),
            tiny_duration_seconds: default_tiny_duration_seconds(),
            big_interval_count: default_big_interval_count(),
            big_duration_minutes: default_big_duration_minutes(),
            postpone_minutes: default_postpone_minutes(),
            use_idle_detection: true,
        }
    }
}

impl BreakConfig {
    /// Convert to whole seconds, clamping every value into `1..=MAX_DURATION_SECS`
    /// (the interval count into `1..=u32::MAX`).
    ///
    /// A reminder must keep running on a broken config, so this never fails.
    pub fn timings(&self) -> TimingSettings {
        TimingSettings {
            tiny_interval: minutes_to_secs("tiny_interval_minutes", self.tiny_interval_minutes),
            tiny_duration: clamp_positive(
                "tiny_duration_seconds",
                self.tiny_duration_seconds,
                MAX_DURATION_SECS,
            ),
            big_interval_count: clamp_positive(
                "big_interval_count",
                self.big_interval_count,
                u64::from(u32::MAX),
            ) as u32,
            big_duration: minutes_to_secs("big_duration_minutes", self.big_duration_minutes),
            postpone: minutes_to_secs("postpone_minutes", self.postpone_minutes),
            use_idle_detection: self.use_idle_detection,
        }
    }
}

/// Upper bound for any interval or duration: one day.
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

fn minutes_to_secs(field: &str, minutes: f64) -> u64 {
    let secs = minutes * 60.0;
    if secs.is_nan() || secs < 1.0 {
        tracing::warn!("⚠️ Invalid {field} ({minutes}), clamping to 1 second");
        return 1;
    }
    if secs > MAX_DURATION_SECS as f64 {
        tracing::warn!("⚠️ {field} ({minutes}) too large, clamping to {MAX_DURATION_SECS} seconds");
        return MAX_DURATION_SECS;
    }
    secs as u64
}

fn clamp_positive(field: &str, value: i64, max: u64) -> u64 {
    if value < 1 {
        tracing::warn!("⚠️ Invalid {field} ({value}), clamping to 1");
        return 1;
    }
    if value as u64 > max {
        tracing::warn!("⚠️ {field} ({value}) too large, clamping to {max}");
        return max;
    }
    value as u64
}

/// Sanitized break timing in seconds. Every value is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSettings {
    pub tiny_interval: u64,
    pub tiny_duration: u64,
    pub big_interval_count: u32,
    pub big_duration: u64,
    pub postpone: u64,
    pub use_idle_detection: bool,
}

impl Default for TimingSettings {
    fn default() -> Self {
        BreakConfig::default().timings()
    }
}

/// Idle detection probe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleConfig {
    /// External command printing the idle time in milliseconds.
    #[serde(default = "default_idle_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_idle_command() -> String { "xprintidle".into() }

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            command: default_idle_command(),
            args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RsiConfig::default();
        let t = config.breaks.timings();
        assert_eq!(t.tiny_interval, 600);
        assert_eq!(t.tiny_duration, 20);
        assert_eq!(t.big_interval_count, 3);
        assert_eq!(t.big_duration, 60);
        assert_eq!(t.postpone, 300);
        assert!(t.use_idle_detection);
        assert_eq!(config.idle.command, "xprintidle");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [breaks]
            tiny_interval_minutes = 0.5
            tiny_duration_seconds = 10
            big_interval_count = 5
            use_idle_detection = false
        "#;

        let config: RsiConfig = toml::from_str(toml_str).unwrap();
        let t = config.breaks.timings();
        assert_eq!(t.tiny_interval, 30);
        assert_eq!(t.tiny_duration, 10);
        assert_eq!(t.big_interval_count, 5);
        assert_eq!(t.big_duration, 60);
        assert!(!t.use_idle_detection);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: RsiConfig = toml::from_str("").unwrap();
        assert_eq!(config, RsiConfig::default());
    }

    #[test]
    fn test_invalid_values_are_clamped() {
        let config = BreakConfig {
            tiny_interval_minutes: -3.0,
            tiny_duration_seconds: 0,
            big_interval_count: -1,
            big_duration_minutes: f64::NAN,
            postpone_minutes: 0.0,
            use_idle_detection: true,
        };
        let t = config.timings();
        assert_eq!(t.tiny_interval, 1);
        assert_eq!(t.tiny_duration, 1);
        assert_eq!(t.big_interval_count, 1);
        assert_eq!(t.big_duration, 1);
        assert_eq!(t.postpone, 1);
    }

    #[test]
    fn test_huge_values_are_clamped() {
        let config = BreakConfig {
            tiny_interval_minutes: 1e300,
            tiny_duration_seconds: i64::MAX,
            big_interval_count: i64::MAX,
            big_duration_minutes: f64::INFINITY,
            postpone_minutes: 1e14,
            use_idle_detection: true,
        };
        let t = config.timings();
        assert_eq!(t.tiny_interval, MAX_DURATION_SECS);
        assert_eq!(t.tiny_duration, MAX_DURATION_SECS);
        assert_eq!(t.big_interval_count, u32::MAX);
        assert_eq!(t.big_duration, MAX_DURATION_SECS);
        assert_eq!(t.postpone, MAX_DURATION_SECS);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join("rsiguard-test-config");
        let path = dir.join("config.toml");
        let mut config = RsiConfig::default();
        config.breaks.big_interval_count = 4;
        config.idle.command = "my-idle-probe".into();
        config.save_to(&path).unwrap();

        let loaded = RsiConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_bad_file_is_config_error() {
        let dir = std::env::temp_dir().join("rsiguard-test-bad-config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[breaks\nnot toml").unwrap();

        let err = RsiConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, RsiError::Config(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_home_dir() {
        let home = RsiConfig::home_dir();
        assert!(home.to_string_lossy().contains("rsiguard"));
    }
}
