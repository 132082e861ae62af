//! Tool Invoker
//!
//! Executes a batch of requested tool calls in order and returns one result
//! per request, in the same order. Results for the whole batch are handed
//! back together; the caller appends them to the conversation only after the
//! batch completes, so a cancelled run never leaves a half-recorded batch.

use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::tools::{execute_tool, BuiltinTool};
use crate::types::{InferenceToolCall, ToolCallResult, ToolContext};

/// Dispatch every requested call in request order. Malformed argument JSON
/// and unknown tool names become failed results, never panics or early
/// returns; the model sees each failure as tool output.
pub async fn invoke_batch(
    requests: &[InferenceToolCall],
    tools: &[BuiltinTool],
    ctx: &ToolContext,
) -> Vec<ToolCallResult> {
    let mut results = Vec::with_capacity(requests.len());

    for request in requests {
        let name = &request.function.name;
        let args: Value = match serde_json::from_str(&request.function.arguments) {
            Ok(value) => value,
            Err(err) => {
                warn!(tool = %name, %err, "malformed tool arguments");
                results.push(ToolCallResult {
                    id: request.id.clone(),
                    name: name.clone(),
                    arguments: Value::Null,
                    result: String::new(),
                    duration_ms: 0,
                    error: Some(format!("Invalid tool arguments: {}", err)),
                });
                continue;
            }
        };

        debug!(tool = %name, id = %request.id, "executing tool call");
        let result = execute_tool(&request.id, name, &args, tools, ctx).await;
        results.push(result);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::create_builtin_tools;
    use crate::types::{default_config, InferenceToolCallFunction};
    use uuid::Uuid;

    fn request(id: &str, name: &str, arguments: &str) -> InferenceToolCall {
        InferenceToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: InferenceToolCallFunction {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn test_context() -> ToolContext {
        ToolContext {
            config: default_config(),
            workspace_dir: std::env::temp_dir().join(format!("automind-test-{}", Uuid::new_v4())),
        }
    }

    #[tokio::test]
    async fn test_results_preserve_request_order() {
        let tools = create_builtin_tools();
        let ctx = test_context();
        let requests = vec![
            request("tc_1", "write_file", r#"{"path":"a.txt","content":"a"}"#),
            request("tc_2", "read_file", r#"{"path":"a.txt"}"#),
            request("tc_3", "terminate", r#"{"status":"success"}"#),
        ];

        let results = invoke_batch(&requests, &tools, &ctx).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "tc_1");
        assert_eq!(results[1].id, "tc_2");
        assert_eq!(results[2].id, "tc_3");

        let _ = std::fs::remove_dir_all(&ctx.workspace_dir);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_failed_result() {
        let tools = create_builtin_tools();
        let ctx = test_context();
        let requests = vec![request("tc_1", "launch_rocket", "{}")];

        let results = invoke_batch(&requests, &tools, &ctx).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].succeeded());
        assert!(results[0].error.as_deref().unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_become_failed_result() {
        let tools = create_builtin_tools();
        let ctx = test_context();
        let requests = vec![request("tc_1", "read_file", "not json")];

        let results = invoke_batch(&requests, &tools, &ctx).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].succeeded());
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("Invalid tool arguments"));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let tools = create_builtin_tools();
        let ctx = test_context();
        let requests = vec![
            request("tc_1", "no_such_tool", "{}"),
            request("tc_2", "write_file", r#"{"path":"b.txt","content":"b"}"#),
        ];

        let results = invoke_batch(&requests, &tools, &ctx).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].succeeded());
        assert!(results[1].succeeded());

        let _ = std::fs::remove_dir_all(&ctx.workspace_dir);
    }

    #[tokio::test]
    async fn test_empty_batch_returns_empty() {
        let tools = create_builtin_tools();
        let ctx = test_context();
        let results = invoke_batch(&[], &tools, &ctx).await;
        assert!(results.is_empty());
    }
}
