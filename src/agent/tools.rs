//! Agent Tool System
//!
//! Defines the tools the agent can call and dispatches execution. Tool
//! execution is a match statement on the tool name; every tool returns a
//! `ToolCallResult`, failures included, so the loop can always report the
//! outcome back to the model.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::fs;

use crate::types::{
    FileArtifact, InferenceToolDefinition, InferenceToolDefinitionFunction, ToolCallResult,
    ToolContext,
};

/// Name of the sentinel tool the model calls to end the run.
pub const TERMINATE_TOOL: &str = "terminate";

/// Name of the file-writing tool; the only built-in that produces artifacts.
pub const WRITE_FILE_TOOL: &str = "write_file";

/// A built-in tool the agent can invoke.
#[derive(Debug, Clone)]
pub struct BuiltinTool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Create all built-in tools available to the agent.
pub fn create_builtin_tools() -> Vec<BuiltinTool> {
    vec![
        BuiltinTool {
            name: TERMINATE_TOOL.to_string(),
            description: "Terminate the run when the task is complete or cannot proceed. \
                          Call this as soon as you have produced the final answer."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "description": "success or failure"
                    }
                },
                "required": ["status"]
            }),
        },
        BuiltinTool {
            name: WRITE_FILE_TOOL.to_string(),
            description: "Write content to a file in the agent workspace. Paths are relative \
                          to the workspace directory."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Relative file path" },
                    "content": { "type": "string", "description": "File content" }
                },
                "required": ["path", "content"]
            }),
        },
        BuiltinTool {
            name: "read_file".to_string(),
            description: "Read content from a file in the agent workspace.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Relative file path to read" }
                },
                "required": ["path"]
            }),
        },
    ]
}

/// Convert `BuiltinTool` list to OpenAI-compatible inference tool definitions.
pub fn tools_to_inference_format(tools: &[BuiltinTool]) -> Vec<InferenceToolDefinition> {
    tools
        .iter()
        .map(|t| InferenceToolDefinition {
            def_type: "function".to_string(),
            function: InferenceToolDefinitionFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .collect()
}

/// Execute a tool call and return the result. Unknown tool names produce a
/// failed result rather than an error; the model sees the failure text and
/// can recover on the next step.
pub async fn execute_tool(
    id: &str,
    tool_name: &str,
    args: &Value,
    tools: &[BuiltinTool],
    ctx: &ToolContext,
) -> ToolCallResult {
    let start = Instant::now();

    if !tools.iter().any(|t| t.name == tool_name) {
        return ToolCallResult {
            id: id.to_string(),
            name: tool_name.to_string(),
            arguments: args.clone(),
            result: String::new(),
            duration_ms: 0,
            error: Some(format!("Unknown tool: {}", tool_name)),
        };
    }

    match execute_tool_inner(tool_name, args, ctx).await {
        Ok(output) => ToolCallResult {
            id: id.to_string(),
            name: tool_name.to_string(),
            arguments: args.clone(),
            result: output,
            duration_ms: start.elapsed().as_millis() as u64,
            error: None,
        },
        Err(err) => ToolCallResult {
            id: id.to_string(),
            name: tool_name.to_string(),
            arguments: args.clone(),
            result: String::new(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: Some(err.to_string()),
        },
    }
}

/// Internal tool execution dispatch.
async fn execute_tool_inner(tool_name: &str, args: &Value, ctx: &ToolContext) -> Result<String> {
    match tool_name {
        TERMINATE_TOOL => {
            let status = args["status"].as_str().unwrap_or("success");
            Ok(format!("Run terminated with status: {}", status))
        }

        WRITE_FILE_TOOL => {
            let file_path = args["path"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;
            let content = args["content"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Missing 'content' argument"))?;

            let resolved = resolve_workspace_path(&ctx.workspace_dir, file_path)?;
            if let Some(parent) = resolved.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&resolved, content).await?;

            let artifact = FileArtifact {
                path: resolved.to_string_lossy().to_string(),
                bytes: content.len() as u64,
            };
            Ok(serde_json::to_string(&json!({
                "message": format!("File written: {}", file_path),
                "file": artifact,
            }))?)
        }

        "read_file" => {
            let file_path = args["path"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;

            let resolved = resolve_workspace_path(&ctx.workspace_dir, file_path)?;
            let content = fs::read_to_string(&resolved).await?;
            Ok(content)
        }

        _ => anyhow::bail!("Tool '{}' has no executor", tool_name),
    }
}

/// Resolve a tool-supplied path against the workspace directory. Absolute
/// paths and parent-directory components are rejected so the file tools stay
/// confined to the workspace.
fn resolve_workspace_path(workspace_dir: &Path, raw: &str) -> Result<PathBuf> {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        anyhow::bail!("Absolute paths are not allowed: {}", raw);
    }
    for component in candidate.components() {
        match component {
            Component::ParentDir => anyhow::bail!("Path escapes workspace: {}", raw),
            Component::Prefix(_) | Component::RootDir => {
                anyhow::bail!("Invalid path: {}", raw)
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(workspace_dir.join(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::default_config;
    use uuid::Uuid;

    fn test_context(dir: &Path) -> ToolContext {
        ToolContext {
            config: default_config(),
            workspace_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_builtin_tools_include_sentinel() {
        let tools = create_builtin_tools();
        assert!(tools.iter().any(|t| t.name == TERMINATE_TOOL));
        assert!(tools.iter().any(|t| t.name == "write_file"));
        assert!(tools.iter().any(|t| t.name == "read_file"));
    }

    #[test]
    fn test_inference_format_shape() {
        let defs = tools_to_inference_format(&create_builtin_tools());
        assert_eq!(defs.len(), 3);
        for def in &defs {
            assert_eq!(def.def_type, "function");
            assert!(!def.function.name.is_empty());
            assert!(def.function.parameters.is_object());
        }
    }

    #[test]
    fn test_workspace_path_confinement() {
        let ws = Path::new("/tmp/ws");
        assert!(resolve_workspace_path(ws, "notes.txt").is_ok());
        assert!(resolve_workspace_path(ws, "sub/dir/file.md").is_ok());
        assert!(resolve_workspace_path(ws, "../escape.txt").is_err());
        assert!(resolve_workspace_path(ws, "/etc/passwd").is_err());
        assert!(resolve_workspace_path(ws, "ok/../../bad").is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_without_error() {
        let dir = std::env::temp_dir().join(format!("automind-test-{}", Uuid::new_v4()));
        let ctx = test_context(&dir);
        let tools = create_builtin_tools();

        let result = execute_tool("tc_1", "frobnicate", &json!({}), &tools, &ctx).await;
        assert!(!result.succeeded());
        assert!(result.error.as_deref().unwrap().contains("Unknown tool"));
        assert_eq!(result.name, "frobnicate");
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = std::env::temp_dir().join(format!("automind-test-{}", Uuid::new_v4()));
        let ctx = test_context(&dir);
        let tools = create_builtin_tools();

        let write = execute_tool(
            "tc_w",
            "write_file",
            &json!({"path": "out/report.txt", "content": "hello"}),
            &tools,
            &ctx,
        )
        .await;
        assert!(write.succeeded(), "write failed: {:?}", write.error);

        let payload: Value = serde_json::from_str(&write.result).unwrap();
        assert_eq!(payload["file"]["bytes"], 5);

        let read = execute_tool(
            "tc_r",
            "read_file",
            &json!({"path": "out/report.txt"}),
            &tools,
            &ctx,
        )
        .await;
        assert!(read.succeeded());
        assert_eq!(read.result, "hello");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_terminate_reports_status() {
        let dir = std::env::temp_dir().join(format!("automind-test-{}", Uuid::new_v4()));
        let ctx = test_context(&dir);
        let tools = create_builtin_tools();

        let result = execute_tool(
            "tc_t",
            TERMINATE_TOOL,
            &json!({"status": "success"}),
            &tools,
            &ctx,
        )
        .await;
        assert!(result.succeeded());
        assert!(result.result.contains("success"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_tool_failure() {
        let dir = std::env::temp_dir().join(format!("automind-test-{}", Uuid::new_v4()));
        let ctx = test_context(&dir);
        let tools = create_builtin_tools();

        let result = execute_tool("tc_m", "write_file", &json!({}), &tools, &ctx).await;
        assert!(!result.succeeded());
        assert!(result.error.as_deref().unwrap().contains("path"));
    }
}
