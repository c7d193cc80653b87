//! File reading tool.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

/// Read the content of a code file.
pub struct ReadCodeFile;

#[async_trait]
impl Tool for ReadCodeFile {
    fn name(&self) -> &str {
        "read_code_file"
    }

    fn description(&self) -> &str {
        "Read the content of a code file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the code file"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let path = args["file_path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'file_path' argument"))?;

        let full_path = workspace.join(path);
        tracing::info!("Reading file: {}", full_path.display());

        tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", full_path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_relative_to_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();

        let content = ReadCodeFile
            .execute(json!({"file_path": "main.rs"}), dir.path())
            .await
            .unwrap();
        assert_eq!(content, "fn main() {}\n");
    }

    #[tokio::test]
    async fn absolute_paths_are_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.rs");
        std::fs::write(&file, "pub fn f() {}").unwrap();

        let other = tempfile::tempdir().unwrap();
        let content = ReadCodeFile
            .execute(json!({"file_path": file.to_string_lossy()}), other.path())
            .await
            .unwrap();
        assert_eq!(content, "pub fn f() {}");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReadCodeFile
            .execute(json!({"file_path": "nope.rs"}), dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope.rs"));
    }
}
