//! User intents coming from the tray menu, the break overlay or the CLI.

use rsiguard_core::BreakConfig;

/// A request from the user, applied between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Skip,
    Postpone,
    /// Lock the session. Not scheduler state, just passed through.
    Lock,
    ToggleSuspend,
    Suspend,
    Resume,
    ForceBreakNow,
    Reconfigure(BreakConfig),
    /// Stop the engine loop.
    Quit,
}

impl UserAction {
    /// Parse a CLI command word (`skip`, `postpone`, `pause`, ...).
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "skip" | "s" => Some(Self::Skip),
            "postpone" | "p" => Some(Self::Postpone),
            "lock" | "l" => Some(Self::Lock),
            "toggle" | "t" => Some(Self::ToggleSuspend),
            "suspend" | "pause" => Some(Self::Suspend),
            "resume" | "unpause" => Some(Self::Resume),
            "break" | "now" | "b" => Some(Self::ForceBreakNow),
            "quit" | "exit" | "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(UserAction::parse("skip"), Some(UserAction::Skip));
        assert_eq!(UserAction::parse("  Postpone\n"), Some(UserAction::Postpone));
        assert_eq!(UserAction::parse("pause"), Some(UserAction::Suspend));
        assert_eq!(UserAction::parse("now"), Some(UserAction::ForceBreakNow));
        assert_eq!(UserAction::parse("q"), Some(UserAction::Quit));
        assert_eq!(UserAction::parse("reconfigure"), None);
    }
}
