//! Core agent loop implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::config::Config;
use crate::llm::{CompletionRequest, LlmClient, OpenAiCompatClient};
use crate::tools::ToolRegistry;

use super::family::{ModelFamily, PromptDialect};
use super::parser::{has_final_answer, OutputParser};
use super::prompt::build_prompt;
use super::stopped::StoppedResponsePolicy;
use super::types::{AgentRun, LogEntryType, ParseResult, RunLogEntry, Step, ToolCall};

/// Tool name recorded for turns whose output could not be parsed.
pub const PARSE_ERROR_TOOL: &str = "_Exception";

/// Observation recorded for turns whose output could not be parsed.
pub const PARSE_ERROR_OBSERVATION: &str = "Invalid or incomplete response";

/// Drives the model/tool loop for one family and dialect.
pub struct AgentExecutor {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    parser: Box<dyn OutputParser>,
    template: &'static str,
    stop: Vec<String>,
    model: String,
    temperature: f32,
    workspace: PathBuf,
    max_iterations: usize,
    max_execution_time: Duration,
    handle_parsing_errors: bool,
    stopped_policy: StoppedResponsePolicy,
}

impl AgentExecutor {
    /// Build an executor talking to the configured OpenAI-compatible endpoint.
    pub fn from_config(config: &Config, tools: Arc<ToolRegistry>) -> Self {
        let llm = Arc::new(OpenAiCompatClient::new(
            config.api_base.clone(),
            config.api_key.clone(),
        ));
        Self::with_client(config, llm, tools)
    }

    /// Build an executor around an arbitrary model client.
    pub fn with_client(config: &Config, llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        let family: ModelFamily = config.model_family;
        let dialect: PromptDialect = config.dialect;
        tracing::info!(
            family = %family,
            dialect = ?dialect,
            model = %config.model,
            tools = ?tools.names(),
            "Creating agent executor"
        );

        Self {
            llm,
            tools,
            parser: family.output_parser(dialect),
            template: family.prompt_template(dialect),
            stop: family.stop_sequences(),
            model: config.model.clone(),
            temperature: config.temperature,
            workspace: config.workspace_path.clone(),
            max_iterations: config.max_iterations,
            max_execution_time: config.max_execution_time,
            handle_parsing_errors: config.handle_parsing_errors,
            stopped_policy: StoppedResponsePolicy::new(),
        }
    }

    /// Run the agent on `input` until a final answer or a limit.
    pub async fn run(&self, input: &str) -> anyhow::Result<AgentRun> {
        let started = Instant::now();
        let mut steps: Vec<Step> = Vec::new();
        let mut log = Vec::new();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            let Some(remaining) = self.max_execution_time.checked_sub(started.elapsed()) else {
                break;
            };
            iterations += 1;
            tracing::debug!("Agent iteration {}", iterations);

            let request = CompletionRequest {
                model: self.model.clone(),
                prompt: build_prompt(self.template, &self.tools, input, &steps),
                stop: self.stop.clone(),
                temperature: self.temperature,
            };

            let completion = match tokio::time::timeout(remaining, self.llm.complete(&request)).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!("Model call exceeded the remaining time budget");
                    break;
                }
            };
            let text = restore_action_label(&completion);
            log.push(RunLogEntry::now(LogEntryType::Thinking, truncate_for_log(&text, 2000)));

            let parsed = match self.parser.parse(&text) {
                Ok(parsed) => parsed,
                Err(e) if self.handle_parsing_errors => {
                    tracing::warn!("Unparseable model output, asking the model to retry: {}", e);
                    log.push(RunLogEntry::now(LogEntryType::Error, e.to_string()));
                    let call = ToolCall {
                        name: PARSE_ERROR_TOOL.to_string(),
                        input: json!(e.to_string()),
                        raw_text: text,
                    };
                    steps.push(Step::new(call, PARSE_ERROR_OBSERVATION));
                    continue;
                }
                Err(e) => {
                    log.push(RunLogEntry::now(LogEntryType::Error, e.to_string()));
                    return Err(e.into());
                }
            };

            match parsed {
                ParseResult::FinalAnswer(answer) => {
                    log.push(RunLogEntry::now(LogEntryType::Response, truncate_for_log(&answer.text, 2000)));
                    return Ok(AgentRun {
                        output: answer.text,
                        steps,
                        log,
                        stopped: false,
                    });
                }
                ParseResult::ToolCall(call) => {
                    log.push(RunLogEntry::now(
                        LogEntryType::ToolCall,
                        format!("Calling tool: {} with args: {}", call.name, call.input),
                    ));
                    let observation = self.invoke(&call).await;
                    log.push(RunLogEntry::now(
                        LogEntryType::ToolResult,
                        truncate_for_log(&observation, 1000),
                    ));
                    steps.push(Step::new(call, observation));
                }
            }
        }

        tracing::info!(
            iterations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Agent stopped before a final answer"
        );
        let answer = self.stopped_policy.on_stopped(&steps, input);
        log.push(RunLogEntry::now(LogEntryType::Stopped, answer.text.clone()));
        Ok(AgentRun {
            output: answer.text,
            steps,
            log,
            stopped: true,
        })
    }

    /// Run a tool call; failures become observation text.
    async fn invoke(&self, call: &ToolCall) -> String {
        if self.tools.get(&call.name).is_none() {
            return format!(
                "{} is not a valid tool, try one of [{}].",
                call.name,
                self.tools.names().join(", ")
            );
        }
        match self
            .tools
            .execute(&call.name, call.input.clone(), &self.workspace)
            .await
        {
            Ok(output) => output,
            Err(e) => format!("Error: {}", e),
        }
    }
}

/// Prompts end with `Action:`, so the model often continues straight into the
/// tool name. Put the label back only when the completion is exactly that
/// shape: a bare name line directly followed by an input label.
fn restore_action_label(completion: &str) -> String {
    if completion.contains("Action:") || has_final_answer(completion) {
        return completion.to_string();
    }
    let Some((name, rest)) = completion.split_once('\n') else {
        return completion.to_string();
    };
    let rest = rest.trim_start();
    let continues_action = !name.trim().is_empty()
        && (rest.starts_with("Action Input:") || rest.starts_with("参数:"));
    if continues_action {
        format!("Action:{}", completion)
    } else {
        completion.to_string()
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}
