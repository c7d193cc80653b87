//! Prompt templates for the agent.
//!
//! Templates use `{tools}`, `{tool_names}`, `{agent_scratchpad}` and `{input}`
//! placeholders. Any other braces are left untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::Step;
use crate::tools::ToolRegistry;

pub const DEEPSEEK_TEMPLATE: &str = r#"工具: {tools}

格式:
Question: {input}
Action: [{tool_names}]之一
Action Input: JSON格式
Observation: 结果
Final Answer: 最终答案

注意事项:
1. 执行工具后，必须分析结果
2. 若结果满足需求，立即提供最终答案
3. 不要重复执行相同的命令
4. 格式为"Final Answer: 你的答案"

{agent_scratchpad}

Question: {input}
Action:"#;

pub const QWEN_TEMPLATE: &str = r#"工具: {tools}

格式:
问题: {input}
Action: [{tool_names}]之一
Action Input: JSON格式
Observation: 结果
Final Answer: 最终答案

{agent_scratchpad}

问题: {input}
Action:"#;

pub const STRUCTURED_CHAT_TEMPLATE: &str = r#"You are an AI assistant that can use tools to help answer questions.

Respond to the human as helpfully and accurately as possible. You have access to the following tools:

{tools}

Use a json blob to specify a tool by providing an action key (tool name) and an action_input key (tool input).

Valid "action" values: "Final Answer" or {tool_names}

Provide only ONE action per $JSON_BLOB, as shown:

```
{
  "action": $TOOL_NAME,
  "action_input": $INPUT
}
```

Follow this format:

Question: input question to answer
Thought: consider previous and subsequent steps
Action:
```
$JSON_BLOB
```
Observation: action result
... (repeat Thought/Action/Observation N times)
Thought: I know what to respond
Action:
```
{
  "action": "Final Answer",
  "action_input": "Final response to human"
}
```

Begin! Reminder to ALWAYS respond with a valid json blob of a single action. Use tools if necessary. Respond directly if appropriate. Format is Action:```$JSON_BLOB```then Observation:.

{agent_scratchpad}

Question: {input}
Thought:"#;

/// Classic English ReAct wording, usable with either family.
pub const REACT_TEMPLATE: &str = r#"You are an AI assistant that can use tools to help answer questions. You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {input}
Thought: {agent_scratchpad}"#;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(tools|tool_names|agent_scratchpad|input)\}").unwrap());

static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").unwrap());

/// Render one line per tool: `name: description Parameters: {...}`.
pub fn format_tools(tools: &ToolRegistry) -> String {
    tools
        .list_tools()
        .iter()
        .map(|t| {
            let desc = NEWLINES.replace_all(&t.description, " ");
            let params = t
                .parameters
                .get("properties")
                .cloned()
                .unwrap_or_else(|| t.parameters.clone());
            format!("{}: {} Parameters: {}", t.name, desc.trim(), params)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Replay earlier steps so the model sees what it already did.
pub fn format_scratchpad(steps: &[Step]) -> String {
    if steps.is_empty() {
        return String::new();
    }
    let thoughts: String = steps
        .iter()
        .map(|s| format!("{}\nObservation: {}\nThought: ", s.call.raw_text, s.observation))
        .collect();
    format!("These were previous tasks you completed:\n{}\n\n", thoughts)
}

/// Fill a template for one turn.
pub fn build_prompt(template: &str, tools: &ToolRegistry, input: &str, steps: &[Step]) -> String {
    let tool_lines = format_tools(tools);
    let tool_names = tools.names().join(", ");
    let scratchpad = format_scratchpad(steps);

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "tools" => tool_lines.clone(),
            "tool_names" => tool_names.clone(),
            "agent_scratchpad" => scratchpad.clone(),
            _ => input.to_string(),
        })
        .into_owned()
}
