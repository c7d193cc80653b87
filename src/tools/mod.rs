//! Tools the agent can invoke, plus the registry that resolves them by name.

mod file;
mod terminal;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use file::ReadCodeFile;
pub use terminal::ShellTool;

/// A tool callable by the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the tool's arguments (`type: object`).
    fn parameters_schema(&self) -> Value;

    /// Run the tool with arguments already bound by [`bind_tool_input`].
    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String>;
}

/// Summary of a registered tool, used for prompt rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolInputError {
    #[error("tool schema declares no parameters, cannot bind {0}")]
    NoParameters(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("unsupported tool input: {0}")]
    Unsupported(String),
}

/// Convert a parsed action input into the argument object a tool expects.
///
/// Strings and other scalars bind to the first required parameter (or the
/// first declared one). Objects pass through after dropping a null `args`
/// entry; required parameters must be present.
pub fn bind_tool_input(schema: &Value, input: Value) -> Result<Value, ToolInputError> {
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut args = match input {
        Value::Object(mut map) => {
            if map.get("args").is_some_and(Value::is_null) {
                map.remove("args");
            }
            map
        }
        array @ Value::Array(_) => return Err(ToolInputError::Unsupported(array.to_string())),
        scalar => {
            let key = required
                .first()
                .map(|k| k.to_string())
                .or_else(|| {
                    schema["properties"]
                        .as_object()
                        .and_then(|p| p.keys().next().cloned())
                })
                .ok_or_else(|| ToolInputError::NoParameters(scalar.to_string()))?;
            let value = match scalar {
                Value::String(s) => Value::String(s),
                Value::Null => Value::String(String::new()),
                other => Value::String(other.to_string()),
            };
            let mut map = serde_json::Map::new();
            map.insert(key, value);
            map
        }
    };

    if let Some(missing) = required.iter().copied().find(|k| !args.contains_key(*k)) {
        // A lone unknown key (e.g. the parser's `query` fallback) is rebound
        // onto a single-parameter tool.
        if required.len() == 1 && args.len() == 1 {
            if let Some((_, value)) = std::mem::take(&mut args).into_iter().next() {
                return bind_tool_input(schema, value);
            }
        }
        return Err(ToolInputError::MissingParameter(missing.to_string()));
    }

    Ok(Value::Object(args))
}

/// Registry of available tools, owned by whoever builds the agent.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registry with the shell and file-reading tools.
    pub fn with_default_tools(command_timeout: Duration) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ShellTool::new(command_timeout)));
        registry.register(Arc::new(ReadCodeFile));
        registry
    }

    /// Add a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Replaced existing tool registration: {}", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Bind `input` to the named tool's parameters and run it.
    pub async fn execute(&self, name: &str, input: Value, workspace: &Path) -> anyhow::Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;
        let args = bind_tool_input(&tool.parameters_schema(), input)?;
        tracing::debug!(tool = name, args = %args, "Executing tool");
        tool.execute(args, workspace).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    #[test]
    fn string_binds_to_first_required_parameter() {
        let args = bind_tool_input(&query_schema(), json!("pwd")).unwrap();
        assert_eq!(args, json!({"query": "pwd"}));
    }

    #[test]
    fn number_is_stringified() {
        let args = bind_tool_input(&query_schema(), json!(42)).unwrap();
        assert_eq!(args, json!({"query": "42"}));
    }

    #[test]
    fn null_args_entry_is_dropped() {
        let args = bind_tool_input(&query_schema(), json!({"query": "ls", "args": null})).unwrap();
        assert_eq!(args, json!({"query": "ls"}));
    }

    #[test]
    fn single_unknown_key_is_rebound() {
        let args = bind_tool_input(&query_schema(), json!({"command": "ls"})).unwrap();
        assert_eq!(args, json!({"query": "ls"}));
    }

    #[test]
    fn missing_required_parameter_is_rejected() {
        let schema = json!({
            "type": "object",
            "properties": { "a": {}, "b": {} },
            "required": ["a", "b"]
        });
        let err = bind_tool_input(&schema, json!({"a": 1})).unwrap_err();
        assert_eq!(err, ToolInputError::MissingParameter("b".to_string()));
    }

    #[test]
    fn arrays_are_unsupported() {
        assert!(matches!(
            bind_tool_input(&query_schema(), json!([1, 2])),
            Err(ToolInputError::Unsupported(_))
        ));
    }

    #[test]
    fn default_registry_lists_tools_by_name() {
        let registry = ToolRegistry::with_default_tools(Duration::from_secs(5));
        assert_eq!(registry.names(), vec!["read_code_file", "shell"]);
        assert!(registry.get("shell").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let result = tokio_test::block_on(registry.execute("nope", json!({}), Path::new(".")));
        assert!(result.is_err());
    }
}
