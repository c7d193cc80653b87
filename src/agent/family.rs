//! Model families and prompt dialects.
//!
//! The family is chosen once at configuration time; everything that differs
//! between families (prompt wording, stop sequences, endpoint defaults) hangs
//! off [`ModelFamily`].

use std::fmt;
use std::str::FromStr;

use super::parser::{CustomOutputParser, OutputParser, StructuredOutputParser};
use super::prompt;

/// Model family the agent is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    DeepSeek,
    Qwen,
}

/// How actions are formatted in model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptDialect {
    /// `Action:` / `Action Input:` lines, parsed leniently.
    #[default]
    Custom,
    /// A JSON blob in a fenced block, parsed strictly.
    Structured,
    /// English ReAct wording with `Thought:` lines, parsed like `Custom`.
    React,
}

impl ModelFamily {
    pub fn default_model(&self) -> &'static str {
        match self {
            ModelFamily::DeepSeek => "deepseek-chat",
            ModelFamily::Qwen => "qwen-plus",
        }
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            ModelFamily::DeepSeek => "https://api.deepseek.com/v1",
            ModelFamily::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
        }
    }

    /// Sequences the model must stop generating at.
    pub fn stop_sequences(&self) -> Vec<String> {
        let stops: &[&str] = match self {
            ModelFamily::DeepSeek => &["<|end_of_text|>", "<|eot_id|>", "\nObservation:", "Observation:"],
            ModelFamily::Qwen => &["<|im_end|>", "<|endoftext|>", "\nObservation:", "Observation:"],
        };
        stops.iter().map(|s| s.to_string()).collect()
    }

    pub fn prompt_template(&self, dialect: PromptDialect) -> &'static str {
        match (self, dialect) {
            (_, PromptDialect::Structured) => prompt::STRUCTURED_CHAT_TEMPLATE,
            (_, PromptDialect::React) => prompt::REACT_TEMPLATE,
            (ModelFamily::DeepSeek, PromptDialect::Custom) => prompt::DEEPSEEK_TEMPLATE,
            (ModelFamily::Qwen, PromptDialect::Custom) => prompt::QWEN_TEMPLATE,
        }
    }

    pub fn output_parser(&self, dialect: PromptDialect) -> Box<dyn OutputParser> {
        match dialect {
            PromptDialect::Custom | PromptDialect::React => Box::new(CustomOutputParser::new()),
            PromptDialect::Structured => Box::new(StructuredOutputParser::new()),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeepSeek => write!(f, "deepseek"),
            Self::Qwen => write!(f, "qwen"),
        }
    }
}

impl FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "qwen" => Ok(Self::Qwen),
            other => Err(format!("unsupported model family: {}", other)),
        }
    }
}

impl FromStr for PromptDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "custom" => Ok(Self::Custom),
            "structured" | "structured-chat" => Ok(Self::Structured),
            "react" => Ok(Self::React),
            other => Err(format!("unknown prompt dialect: {}", other)),
        }
    }
}
