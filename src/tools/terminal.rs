//! Shell command execution tool.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use super::Tool;

/// Run a system shell command.
///
/// The observation is stdout when the command succeeds and stderr otherwise.
/// Spawn failures and timeouts are reported as observation text rather than
/// errors, so the agent can see and react to them.
pub struct ShellTool {
    timeout: Duration,
}

impl ShellTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Use Shell to execute system shell commands."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The command to execute"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let command = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;

        tracing::info!("Executing shell command: {}", command);

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(shell)
                .arg(shell_arg)
                .arg(command)
                .current_dir(workspace)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let result = match output {
            Err(_) => format!(
                "Command timed out after {} seconds",
                self.timeout.as_secs()
            ),
            Ok(Err(e)) => format!("Failed to execute command: {}", e),
            Ok(Ok(output)) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            Ok(Ok(output)) => String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::info!("Shell command result: {}", result);
        Ok(result)
    }
}
