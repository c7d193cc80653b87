//! Fallback answer when the agent loop halts without a final answer.

use super::types::{FinalAnswer, Step};

/// Returned when the run stopped before any tool produced output.
pub const STOPPED_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Coarse guess at what the user asked for, used to phrase the fallback answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentGroup {
    Directory,
    Command,
}

impl IntentGroup {
    /// Groups in priority order.
    pub const ALL: [IntentGroup; 2] = [IntentGroup::Directory, IntentGroup::Command];

    /// Lowercase keywords matched as substrings.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            IntentGroup::Directory => &[
                "pwd",
                "working directory",
                "current directory",
                "directory",
                "当前目录",
                "目录",
            ],
            IntentGroup::Command => &["shell", "command", "run ", "execute", "命令", "执行"],
        }
    }

    fn render(&self, observation: &str) -> String {
        match self {
            IntentGroup::Directory => format!("current directory is: {}", observation),
            IntentGroup::Command => format!("command result: {}", observation),
        }
    }

    /// First group whose keywords appear in `input`, ignoring case.
    pub fn classify(input: &str) -> Option<IntentGroup> {
        let input = input.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|group| group.keywords().iter().any(|kw| input.contains(kw)))
    }
}

/// Synthesizes a final answer from the most recent observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoppedResponsePolicy;

impl StoppedResponsePolicy {
    pub fn new() -> Self {
        Self
    }

    /// `steps` must be in chronological order.
    pub fn on_stopped(&self, steps: &[Step], original_input: &str) -> FinalAnswer {
        let Some(last) = steps.last() else {
            tracing::info!("Agent stopped with no steps, returning generic message");
            return FinalAnswer::new(STOPPED_MESSAGE);
        };

        let observation = last.observation.trim();
        tracing::info!("Building stopped response from last observation: {}", observation);

        let text = match IntentGroup::classify(original_input) {
            Some(group) => group.render(observation),
            None => format!("result: {}", observation),
        };
        FinalAnswer::new(text)
    }
}
