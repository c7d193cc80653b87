//! # Shell Agent
//!
//! A structured-chat agent that drives a shell tool from free-form model output.
//!
//! This library provides:
//! - A lenient parser turning `Action:` / `Action Input:` text into tool calls,
//!   with JSON repair, and a strict parser for the fenced JSON blob dialect
//! - A fallback policy that answers from the last observation when the loop
//!   runs out of iterations or time
//! - An agent loop over an explicit tool registry and an OpenAI-compatible model
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shell_agent::{agent::AgentExecutor, config::Config, tools::ToolRegistry};
//!
//! let config = Config::from_env()?;
//! let tools = Arc::new(ToolRegistry::with_default_tools(config.tool_timeout));
//! let agent = AgentExecutor::from_config(&config, tools);
//! let run = agent.run("What is the current directory?").await?;
//! println!("{}", run.output);
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
