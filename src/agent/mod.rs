//! Agent module - the structured-chat agent.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Render the family's prompt with tools, earlier steps and the user task
//! 2. Call the model, stopping at `Observation:`
//! 3. Parse the text into a tool call or a final answer
//! 4. Run the tool and feed the observation back
//! 5. Repeat until a final answer, or synthesize one when a limit is hit

mod agent_loop;
mod family;
pub mod parser;
pub mod prompt;
pub mod stopped;
pub mod types;

pub use agent_loop::{AgentExecutor, PARSE_ERROR_OBSERVATION, PARSE_ERROR_TOOL};
pub use family::{ModelFamily, PromptDialect};
pub use parser::{CustomOutputParser, OutputParser, ParseError, StructuredOutputParser};
pub use stopped::{IntentGroup, StoppedResponsePolicy};
pub use types::{AgentRun, FinalAnswer, LogEntryType, Observation, ParseResult, RunLogEntry, Step, ToolCall};
