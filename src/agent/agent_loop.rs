//! The Agent Loop
//!
//! The core think/act state machine: gate the goal, think (one inference
//! call), act (dispatch the requested tool batch), check for the sentinel,
//! check the step budget, repeat.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::context::{build_request_messages, extract_final_answer, NO_ANSWER_MARKER};
use crate::agent::invoker::invoke_batch;
use crate::agent::limiter::ToolCallLimiter;
use crate::agent::tools::{
    create_builtin_tools, tools_to_inference_format, BuiltinTool, TERMINATE_TOOL, WRITE_FILE_TOOL,
};
use crate::agent::word_filter::{blocked_outcome, SensitiveWordScanner};
use crate::config::resolve_path;
use crate::error::AgentError;
use crate::types::{
    AgentConfig, AgentStatus, ChatMessage, ChatRole, ConversationStore, FileArtifact,
    InferenceClient, InferenceOptions, RunOutcome, StepRecord, ToolCallResult, ToolContext,
};

/// One goal-directed run over one conversation. An instance owns its
/// conversation exclusively; separate conversations get separate instances
/// sharing only the scanner, the limiter, and the tool registry.
pub struct AgentLoop {
    config: AgentConfig,
    conversation_id: String,
    status: AgentStatus,
    inference: Arc<dyn InferenceClient>,
    scanner: Arc<SensitiveWordScanner>,
    limiter: Arc<ToolCallLimiter>,
    store: Option<Arc<dyn ConversationStore>>,
    tools: Vec<BuiltinTool>,
    tool_context: ToolContext,
    history: Vec<ChatMessage>,
}

impl AgentLoop {
    /// Build a loop for a fresh conversation. Creates the workspace
    /// directory; failure here is fatal, the file tools need it.
    pub fn new(
        config: AgentConfig,
        inference: Arc<dyn InferenceClient>,
        scanner: Arc<SensitiveWordScanner>,
        limiter: Arc<ToolCallLimiter>,
        store: Option<Arc<dyn ConversationStore>>,
    ) -> Result<Self, AgentError> {
        let workspace_dir = std::path::PathBuf::from(resolve_path(&config.workspace_dir));
        std::fs::create_dir_all(&workspace_dir).map_err(|source| AgentError::Workspace {
            path: workspace_dir.to_string_lossy().to_string(),
            source,
        })?;

        let tool_context = ToolContext {
            config: config.clone(),
            workspace_dir,
        };

        Ok(Self {
            config,
            conversation_id: Uuid::new_v4().to_string(),
            status: AgentStatus::Idle,
            inference,
            scanner,
            limiter,
            store,
            tools: create_builtin_tools(),
            tool_context,
            history: Vec::new(),
        })
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Execute the think/act loop for one goal. The content gate runs before
    /// anything else: a blocked goal costs zero inference calls. Each cycle
    /// produces one `StepRecord`; the loop ends on the sentinel tool, on a
    /// step with zero tool calls, or when the step budget runs out.
    pub async fn run(&mut self, goal: &str) -> Result<RunOutcome, AgentError> {
        if self.status != AgentStatus::Idle {
            return Err(AgentError::NotIdle(self.status));
        }

        if self.scanner.contains(goal) {
            info!(conversation_id = %self.conversation_id, "goal blocked by content gate");
            self.status = AgentStatus::Finished;
            return Ok(blocked_outcome());
        }

        self.status = AgentStatus::Running;
        self.history.push(ChatMessage::text(ChatRole::User, goal));
        self.persist_from(0).await;

        let max_steps = self.config.max_steps;
        let mut steps: Vec<StepRecord> = Vec::new();

        for current in 1..=max_steps {
            let persist_mark = self.history.len();

            // Think
            let mut messages = build_request_messages(&self.history, current, max_steps);
            self.limiter.before(&mut messages, &self.conversation_id);

            let options = InferenceOptions {
                max_tokens: Some(self.config.max_tokens_per_call),
                tools: Some(tools_to_inference_format(&self.tools)),
                ..Default::default()
            };

            let response = match self.inference.chat(messages, Some(options)).await {
                Ok(response) => response,
                Err(err) => {
                    // A failed model call is a step with no action; the error
                    // text goes into the history so the model sees it next time.
                    warn!(
                        conversation_id = %self.conversation_id,
                        step = current, %err, "model call failed"
                    );
                    self.history.push(ChatMessage::text(
                        ChatRole::Assistant,
                        format!("[model call failed: {}]", err),
                    ));
                    steps.push(StepRecord {
                        step: current,
                        thought: String::new(),
                        action: format!("model call failed: {}", err),
                        tools: Vec::new(),
                        files: Vec::new(),
                    });
                    self.persist_from(persist_mark).await;
                    if current == max_steps {
                        return Ok(self.exhaust_budget(steps));
                    }
                    continue;
                }
            };

            self.limiter
                .after(&response.finish_reason, &self.conversation_id);

            let thought = response.message.content.clone();
            let requests = response.tool_calls.clone().unwrap_or_default();

            // Zero tool calls is a valid termination: the reasoning text is
            // the answer.
            if requests.is_empty() {
                self.history
                    .push(ChatMessage::text(ChatRole::Assistant, thought.clone()));
                steps.push(StepRecord {
                    step: current,
                    thought: thought.clone(),
                    action: "respond".to_string(),
                    tools: Vec::new(),
                    files: Vec::new(),
                });
                self.persist_from(persist_mark).await;
                self.status = AgentStatus::Finished;
                let answer = if thought.trim().is_empty() {
                    NO_ANSWER_MARKER.to_string()
                } else {
                    thought
                };
                return Ok(RunOutcome {
                    status: self.status,
                    answer,
                    blocked: false,
                    steps,
                });
            }

            let mut assistant = ChatMessage::text(ChatRole::Assistant, thought.clone());
            assistant.tool_calls = Some(requests.clone());
            self.history.push(assistant);

            // Act. The batch fully resolves before anything is appended, so a
            // cancelled run never leaves a half-recorded batch.
            let results = invoke_batch(&requests, &self.tools, &self.tool_context).await;

            let files = collect_file_artifacts(&results);
            let tool_names: Vec<String> = results.iter().map(|r| r.name.clone()).collect();
            let action = summarize_results(&results);

            for result in &results {
                let content = match &result.error {
                    Some(err) => format!("Error: {}", err),
                    None => result.result.clone(),
                };
                self.history.push(ChatMessage {
                    role: ChatRole::Tool,
                    content,
                    name: Some(result.name.clone()),
                    tool_calls: None,
                    tool_call_id: Some(result.id.clone()),
                });
            }

            info!(
                conversation_id = %self.conversation_id,
                step = current,
                tools = ?tool_names,
                "step complete"
            );

            steps.push(StepRecord {
                step: current,
                thought,
                action,
                tools: tool_names,
                files,
            });
            self.persist_from(persist_mark).await;

            // Terminate check: the sentinel ends the run in the same step.
            // Matched by name alone; a malformed argument payload still
            // counts as the model asking to stop.
            let terminated = results.iter().any(|r| r.name == TERMINATE_TOOL);
            if terminated {
                self.status = AgentStatus::Finished;
                return Ok(RunOutcome {
                    status: self.status,
                    answer: extract_final_answer(&self.history),
                    blocked: false,
                    steps,
                });
            }

            // Budget check
            if current == max_steps {
                return Ok(self.exhaust_budget(steps));
            }
        }

        // max_steps == 0; nothing ran
        Ok(self.exhaust_budget(steps))
    }

    /// Terminal outcome for an exhausted step budget: a best-effort partial
    /// answer, flagged as an error only when configured to.
    fn exhaust_budget(&mut self, steps: Vec<StepRecord>) -> RunOutcome {
        info!(
            conversation_id = %self.conversation_id,
            max_steps = self.config.max_steps,
            "step budget exhausted"
        );
        self.status = if self.config.error_on_budget_exhausted {
            AgentStatus::Error
        } else {
            AgentStatus::Finished
        };
        RunOutcome {
            status: self.status,
            answer: extract_final_answer(&self.history),
            blocked: false,
            steps,
        }
    }

    /// Persist history appended since `mark`. Storage failures are logged
    /// and swallowed; persistence never aborts a run.
    async fn persist_from(&self, mark: usize) {
        if let Some(ref store) = self.store {
            let new_messages = &self.history[mark..];
            if new_messages.is_empty() {
                return;
            }
            if let Err(err) = store.append(&self.conversation_id, new_messages).await {
                warn!(
                    conversation_id = %self.conversation_id,
                    %err, "failed to persist conversation"
                );
            }
        }
    }
}

/// Pull `FileArtifact` descriptors out of file-producing tool results.
/// Only results from file-producing tools are considered; a read of a
/// document that merely looks like an artifact payload is not one.
fn collect_file_artifacts(results: &[ToolCallResult]) -> Vec<FileArtifact> {
    results
        .iter()
        .filter(|r| r.name == WRITE_FILE_TOOL && r.succeeded())
        .filter_map(|r| serde_json::from_str::<serde_json::Value>(&r.result).ok())
        .filter_map(|v| serde_json::from_value::<FileArtifact>(v.get("file")?.clone()).ok())
        .collect()
}

/// One-line action summary for the step trace.
fn summarize_results(results: &[ToolCallResult]) -> String {
    results
        .iter()
        .map(|r| match &r.error {
            Some(err) => format!("{} failed: {}", r.name, err),
            None => format!("{} ok", r.name),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
