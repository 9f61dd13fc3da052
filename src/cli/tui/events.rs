//! Event handling and input modes for TUI

/// Input mode for the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal mode - navigation and commands
    Normal,
    /// Insert mode - typing input
    #[default]
    Insert,
}

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
    System,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "you",
            Speaker::Agent => "agent",
            Speaker::System => "metaforge",
        }
    }
}
