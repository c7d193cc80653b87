//! Agent turn and run types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decision to invoke a named tool with a structured input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as emitted by the model (never empty)
    pub name: String,

    /// Tool input, always a JSON value
    pub input: Value,

    /// The full model text this call was parsed from
    pub raw_text: String,
}

/// Terminal answer of an agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub text: String,
}

impl FinalAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Outcome of parsing one model turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseResult {
    ToolCall(ToolCall),
    FinalAnswer(FinalAnswer),
}

/// Textual result of running a tool call.
pub type Observation = String;

/// One executed tool call and what it returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub call: ToolCall,
    pub observation: Observation,
}

impl Step {
    pub fn new(call: ToolCall, observation: impl Into<Observation>) -> Self {
        Self {
            call,
            observation: observation.into(),
        }
    }
}

/// Result of a full agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    /// Final answer text (model-produced or synthesized on stop)
    pub output: String,

    /// Executed steps in chronological order
    pub steps: Vec<Step>,

    /// Detailed execution log
    pub log: Vec<RunLogEntry>,

    /// Whether the run hit its iteration or time limit
    pub stopped: bool,
}

/// A single entry in the run log.
#[derive(Debug, Clone, Serialize)]
pub struct RunLogEntry {
    /// Timestamp (RFC 3339)
    pub timestamp: String,

    /// Entry type
    pub entry_type: LogEntryType,

    /// Content of the entry
    pub content: String,
}

impl RunLogEntry {
    pub fn now(entry_type: LogEntryType, content: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            entry_type,
            content: content.into(),
        }
    }
}

/// Types of run log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    /// Raw model output for a turn
    Thinking,
    /// Tool is being called
    ToolCall,
    /// Tool returned a result
    ToolResult,
    /// Agent produced final response
    Response,
    /// Run hit a limit and a fallback answer was synthesized
    Stopped,
    /// An error occurred
    Error,
}
