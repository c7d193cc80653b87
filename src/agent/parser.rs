//! Parsing of free-form model output into tool calls and final answers.
//!
//! Two dialects are supported:
//! - **Custom**: plain `Action:` / `Action Input:` lines. Parsing never fails;
//!   malformed JSON input goes through a repair ladder and unstructured text
//!   becomes an implicit final answer.
//! - **Structured**: a single JSON blob in a fenced block after `Action:`.
//!   Parsing is strict and reports [`ParseError`] on any deviation.

use std::cmp::Reverse;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

use super::types::{FinalAnswer, ParseResult, ToolCall};

/// `action` value that marks a final answer in the structured dialect.
pub const FINAL_ANSWER_ACTION: &str = "Final Answer";

/// Raised by the strict parser when the model ignored the fenced JSON format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Could not parse LLM output: no action block found in: {0}")]
    MissingBlock(String),

    #[error("Could not parse LLM output: invalid JSON in action block: {0}")]
    InvalidJson(String),

    #[error("Could not parse LLM output: action block has no `action` field")]
    MissingAction,
}

/// Turns one block of model text into a [`ParseResult`].
pub trait OutputParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<ParseResult, ParseError>;
}

// Header patterns: the tool name is captured, the payload is whatever follows
// the match. The match starting latest wins; list order breaks ties.
static ACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)\nAction:\s*([^\n]+)\nAction\s+Input:\s*",
        r"(?s)Action:\s*([^\n]+)\nAction\s+Input:\s*",
        r"(?s)Action:\s*([^\n]+?)\s+Action\s+Input:\s*",
        r"(?s)Action:\s*([^\n]+).*?(?:Input|参数):\s*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FINAL_ANSWER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\nFinal\s+Answer:\s*",
        r"\n最终\s*答案:\s*",
        r"Final\s+Answer:\s*",
        r"最终\s*答案:\s*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());

static FENCED_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(?:^|\n)Action:\s*```(?:json)?(.*?)```").unwrap());

/// Forgiving parser for the plain `Action:` / `Action Input:` dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomOutputParser;

impl CustomOutputParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse model text. Always produces a result.
    pub fn parse_text(&self, text: &str) -> ParseResult {
        tracing::debug!("Parsing model output:\n{}", text);

        if let Some((name, payload)) = find_action(text) {
            tracing::info!(tool = %name, input = %payload, "Matched action");
            let input = parse_action_input(payload);
            return ParseResult::ToolCall(ToolCall {
                name: name.to_string(),
                input,
                raw_text: text.to_string(),
            });
        }

        if let Some(answer) = find_final_answer(text) {
            tracing::info!("Matched final answer: {}", answer);
            return ParseResult::FinalAnswer(FinalAnswer::new(answer));
        }

        tracing::warn!("No structured output found, treating whole text as final answer");
        ParseResult::FinalAnswer(FinalAnswer::new(text.trim()))
    }
}

impl OutputParser for CustomOutputParser {
    fn parse(&self, text: &str) -> Result<ParseResult, ParseError> {
        Ok(self.parse_text(text))
    }
}

/// Strict parser for the fenced JSON blob dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredOutputParser;

impl StructuredOutputParser {
    pub fn new() -> Self {
        Self
    }
}

impl OutputParser for StructuredOutputParser {
    fn parse(&self, text: &str) -> Result<ParseResult, ParseError> {
        let block = FENCED_ACTION
            .captures(text)
            .and_then(|c| c.get(1))
            .ok_or_else(|| ParseError::MissingBlock(text.to_string()))?;

        let action: Value = serde_json::from_str(block.as_str().trim()).map_err(|e| {
            tracing::error!("Failed to parse structured action JSON: {}", e);
            ParseError::InvalidJson(e.to_string())
        })?;

        let name = action
            .get("action")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ParseError::MissingAction)?;

        if name == FINAL_ANSWER_ACTION {
            let text = match action.get("action_input") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            return Ok(ParseResult::FinalAnswer(FinalAnswer { text }));
        }

        Ok(ParseResult::ToolCall(ToolCall {
            name: name.to_string(),
            input: action.get("action_input").cloned().unwrap_or_else(|| json!({})),
            raw_text: text.to_string(),
        }))
    }
}

/// Locate the operative action: `(tool name, raw payload)`.
///
/// Candidates from every pattern compete; the one whose name starts latest in
/// the text wins, with pattern order breaking ties for the same pair.
fn find_action(text: &str) -> Option<(&str, &str)> {
    ACTION_PATTERNS
        .iter()
        .enumerate()
        .flat_map(|(rank, pattern)| {
            pattern.captures_iter(text).filter_map(move |caps| {
                let name = caps.get(1)?;
                let trimmed = name.as_str().trim();
                let end = caps.get(0)?.end();
                (!trimmed.is_empty()).then_some((name.start(), Reverse(rank), trimmed, end))
            })
        })
        .max_by_key(|(start, rank, _, _)| (*start, *rank))
        .map(|(_, _, name, end)| (name, text[end..].trim()))
}

/// Whether `text` carries a `Final Answer:` (or `最终答案:`) marker.
pub fn has_final_answer(text: &str) -> bool {
    FINAL_ANSWER_PATTERNS.iter().any(|pattern| pattern.is_match(text))
}

fn find_final_answer(text: &str) -> Option<&str> {
    FINAL_ANSWER_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find_iter(text).last())
        .map(|m| text[m.end()..].trim())
}

/// A single JSON repair. Each step is pure and idempotent.
type Repair = fn(&str) -> String;

/// Repairs in the order they are tried. Each one builds on the previous.
const REPAIR_LADDER: [(&str, Repair); 4] = [
    ("single_quotes", replace_single_quotes as Repair),
    ("missing_closer", close_open_bracket as Repair),
    ("trailing_commas", strip_trailing_commas as Repair),
    ("fullwidth_colon", replace_fullwidth_colon as Repair),
];

/// Parse an action payload as JSON, repairing it if needed.
///
/// Falls back to `{"query": <payload>}` so the result is always JSON.
pub fn parse_action_input(payload: &str) -> Value {
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Action input is not valid JSON ({}), attempting repair", e);
            repair_json(payload).unwrap_or_else(|| {
                tracing::warn!("Could not repair action input, wrapping as query");
                json!({ "query": payload })
            })
        }
    }
}

/// Run the repair ladder, returning the first candidate that parses.
pub fn repair_json(payload: &str) -> Option<Value> {
    let mut candidate = payload.to_string();
    for (name, repair) in REPAIR_LADDER {
        candidate = repair(&candidate);
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            tracing::info!(step = name, repaired = %candidate, "Repaired action input");
            return Some(value);
        }
    }
    None
}

fn replace_single_quotes(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        s.replace('\'', "\"")
    } else {
        s.to_string()
    }
}

fn close_open_bracket(s: &str) -> String {
    let mut out = s.to_string();
    if !s.ends_with('}') && !s.ends_with(']') {
        if s.contains('{') {
            out.push('}');
        } else if s.contains('[') {
            out.push(']');
        }
    }
    out
}

fn strip_trailing_commas(s: &str) -> String {
    TRAILING_COMMA.replace_all(s, "$1").into_owned()
}

fn replace_fullwidth_colon(s: &str) -> String {
    s.replace('：', ":")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_call(result: ParseResult) -> ToolCall {
        match result {
            ParseResult::ToolCall(call) => call,
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    fn final_text(result: ParseResult) -> String {
        match result {
            ParseResult::FinalAnswer(answer) => answer.text,
            other => panic!("expected final answer, got {:?}", other),
        }
    }

    #[test]
    fn parses_well_formed_action() {
        let parser = CustomOutputParser::new();
        let call = tool_call(parser.parse_text("Action: shell\nAction Input: {\"a\":1}"));
        assert_eq!(call.name, "shell");
        assert_eq!(call.input, json!({"a": 1}));
        assert_eq!(call.raw_text, "Action: shell\nAction Input: {\"a\":1}");
    }

    #[test]
    fn last_action_wins() {
        let text = "Thought: first try\nAction: search\nAction Input: {\"q\": \"a\"}\n\
                    Thought: actually\nAction: shell\nAction Input: {\"query\": \"pwd\"}";
        let call = tool_call(CustomOutputParser.parse_text(text));
        assert_eq!(call.name, "shell");
        assert_eq!(call.input, json!({"query": "pwd"}));
    }

    #[test]
    fn last_action_wins_without_leading_newline() {
        let text = "Action: a\nAction Input: {\"n\": 1}\nAction: b\nAction Input: {\"n\": 2}";
        let call = tool_call(CustomOutputParser.parse_text(text));
        assert_eq!(call.name, "b");
        assert_eq!(call.input, json!({"n": 2}));
    }

    #[test]
    fn last_action_wins_when_it_uses_blank_line_form() {
        let text = "Thought: try a\nAction: a\nAction Input: {\"n\": 1}\n\
                    Thought: better\nAction: b\n\nAction Input: {\"n\": 2}";
        let call = tool_call(CustomOutputParser.parse_text(text));
        assert_eq!(call.name, "b");
        assert_eq!(call.input, json!({"n": 2}));
    }

    #[test]
    fn last_action_wins_when_it_uses_chinese_label() {
        let text = "Thought: try a\nAction: a\nAction Input: {\"n\": 1}\n\
                    Thought: better\nAction: b\n参数: {\"n\": 2}";
        let call = tool_call(CustomOutputParser.parse_text(text));
        assert_eq!(call.name, "b");
        assert_eq!(call.input, json!({"n": 2}));
    }

    #[test]
    fn last_action_wins_when_it_lacks_leading_newline() {
        let text = "Thought: try a\nAction: a\nAction Input: {\"n\": 1}Action: b\nAction Input: {\"n\": 2}";
        let call = tool_call(CustomOutputParser.parse_text(text));
        assert_eq!(call.name, "b");
        assert_eq!(call.input, json!({"n": 2}));
    }

    #[test]
    fn same_line_pair_keeps_bare_name() {
        let call = tool_call(CustomOutputParser.parse_text("Action: shell Action Input: {\"query\": \"ls\"}"));
        assert_eq!(call.name, "shell");
        assert_eq!(call.input, json!({"query": "ls"}));
    }

    #[test]
    fn detects_final_answer_marker() {
        assert!(has_final_answer("Thought: ok\nFinal Answer: done"));
        assert!(has_final_answer("最终 答案: 完成"));
        assert!(!has_final_answer("Action: shell\nAction Input: {}"));
    }

    #[test]
    fn tolerates_blank_lines_between_labels() {
        let call = tool_call(
            CustomOutputParser.parse_text("Action:  shell  \n\n   Action Input:\n{\"query\": \"ls\"}"),
        );
        assert_eq!(call.name, "shell");
        assert_eq!(call.input, json!({"query": "ls"}));
    }

    #[test]
    fn accepts_chinese_input_label() {
        let call = tool_call(CustomOutputParser.parse_text("Action: shell\n参数: {\"query\": \"ls\"}"));
        assert_eq!(call.name, "shell");
        assert_eq!(call.input, json!({"query": "ls"}));
    }

    #[test]
    fn repairs_single_quotes() {
        let call = tool_call(CustomOutputParser.parse_text("Action: search\nAction Input: {'q': 'x'}"));
        assert_eq!(call.input, json!({"q": "x"}));
    }

    #[test]
    fn repairs_trailing_comma() {
        let call = tool_call(CustomOutputParser.parse_text("Action: t\nAction Input: {\"a\": 1,}"));
        assert_eq!(call.input, json!({"a": 1}));
    }

    #[test]
    fn repairs_missing_closing_brace() {
        let call = tool_call(CustomOutputParser.parse_text("Action: t\nAction Input: {\"a\": 1"));
        assert_eq!(call.input, json!({"a": 1}));
    }

    #[test]
    fn repairs_missing_closing_bracket() {
        let call = tool_call(CustomOutputParser.parse_text("Action: t\nAction Input: [1, 2"));
        assert_eq!(call.input, json!([1, 2]));
    }

    #[test]
    fn repairs_fullwidth_colon() {
        let call = tool_call(CustomOutputParser.parse_text("Action: t\nAction Input: {\"query\"： \"pwd\"}"));
        assert_eq!(call.input, json!({"query": "pwd"}));
    }

    #[test]
    fn unrepairable_input_is_wrapped_as_query() {
        let call = tool_call(CustomOutputParser.parse_text("Action: shell\nAction Input: pwd"));
        assert_eq!(call.name, "shell");
        assert_eq!(call.input, json!({"query": "pwd"}));
    }

    #[test]
    fn scalar_json_input_is_kept() {
        let call = tool_call(CustomOutputParser.parse_text("Action: shell\nAction Input: \"ls -la\""));
        assert_eq!(call.input, json!("ls -la"));
    }

    #[test]
    fn final_answer_marker() {
        assert_eq!(final_text(CustomOutputParser.parse_text("Final Answer: done")), "done");
    }

    #[test]
    fn chinese_final_answer_marker() {
        let text = "思考完毕\n最终答案: /home/user";
        assert_eq!(final_text(CustomOutputParser.parse_text(text)), "/home/user");
    }

    #[test]
    fn last_final_answer_wins() {
        let text = "Final Answer: draft\nFinal Answer: real answer\n";
        assert_eq!(final_text(CustomOutputParser.parse_text(text)), "real answer");
    }

    #[test]
    fn unstructured_text_is_implicit_final_answer() {
        let text = "  The current directory is /tmp.\n";
        assert_eq!(final_text(CustomOutputParser.parse_text(text)), "The current directory is /tmp.");
    }

    #[test]
    fn action_takes_precedence_over_final_answer() {
        let text = "Final Answer: not yet\nAction: shell\nAction Input: {\"query\": \"pwd\"}";
        let call = tool_call(CustomOutputParser.parse_text(text));
        assert_eq!(call.name, "shell");
    }

    #[test]
    fn reparsing_raw_text_is_stable() {
        let text = "Thought: hmm\nAction: shell\nAction Input: {'query': 'pwd'}";
        let first = CustomOutputParser.parse_text(text);
        let raw = tool_call(first.clone()).raw_text;
        assert_eq!(CustomOutputParser.parse_text(&raw), first);
    }

    #[test]
    fn custom_parser_never_errors() {
        assert!(CustomOutputParser.parse("").is_ok());
        assert!(CustomOutputParser.parse("Action:").is_ok());
    }

    #[test]
    fn repair_steps_are_idempotent() {
        for (_, repair) in REPAIR_LADDER {
            for input in ["{'a': 1", "{\"a\": 1,}", "[1,", "{\"a\"：1}", "plain"] {
                let once = repair(input);
                assert_eq!(repair(&once), once);
            }
        }
    }

    #[test]
    fn single_quotes_left_alone_when_double_quotes_present() {
        assert_eq!(replace_single_quotes("{\"it's\": 1}"), "{\"it's\": 1}");
    }

    #[test]
    fn structured_tool_call() {
        let text = "Thought: list files\nAction:\n```\n{\"action\": \"shell\", \"action_input\": {\"query\": \"ls\"}}\n```";
        let call = tool_call(StructuredOutputParser.parse(text).unwrap());
        assert_eq!(call.name, "shell");
        assert_eq!(call.input, json!({"query": "ls"}));
    }

    #[test]
    fn structured_final_answer() {
        let text = "Action:\n```json\n{\"action\": \"Final Answer\", \"action_input\": \"all done\"}\n```";
        assert_eq!(final_text(StructuredOutputParser.parse(text).unwrap()), "all done");
    }

    #[test]
    fn structured_missing_block_is_error() {
        let err = StructuredOutputParser.parse("Final Answer: done").unwrap_err();
        assert!(matches!(err, ParseError::MissingBlock(_)));
    }

    #[test]
    fn structured_invalid_json_is_error() {
        let text = "Action:\n```\n{'action': 'shell'}\n```";
        let err = StructuredOutputParser.parse(text).unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn structured_missing_action_is_error() {
        let text = "Action:\n```\n{\"action_input\": \"x\"}\n```";
        assert_eq!(StructuredOutputParser.parse(text).unwrap_err(), ParseError::MissingAction);
    }
}
