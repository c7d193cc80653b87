//! Shell Agent - command line entry point.
//!
//! Runs one task given on the command line and prints the answer.

use std::sync::Arc;

use shell_agent::{agent::AgentExecutor, config::Config, tools::ToolRegistry};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_TASK: &str = "使用shell工具执行pwd命令，并告诉我当前目录";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shell_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: family={} model={} max_iterations={}",
        config.model_family, config.model, config.max_iterations
    );

    let task = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let task = if task.trim().is_empty() {
        DEFAULT_TASK.to_string()
    } else {
        task
    };

    let tools = Arc::new(ToolRegistry::with_default_tools(config.tool_timeout));
    let agent = AgentExecutor::from_config(&config, tools);

    info!("Running task: {}", task);
    let run = agent.run(&task).await?;
    info!(steps = run.steps.len(), stopped = run.stopped, "Agent finished");

    println!("{}", run.output);
    Ok(())
}
