//! Automind - Type Definitions
//!
//! All shared types for the task-oriented agent runtime: conversation
//! messages, tool-call shapes, the step trace, and the collaborator traits
//! (inference client, conversation store).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub name: String,
    pub inference_api_url: String,
    pub inference_api_key: String,
    pub inference_model: String,
    pub max_tokens_per_call: u32,
    /// Maximum think/act cycles per run before forced termination.
    pub max_steps: u32,
    /// Treat an exhausted step budget as an error instead of a partial answer.
    pub error_on_budget_exhausted: bool,
    /// Maximum tool-result messages per conversation before the limiter
    /// injects its steering instruction.
    pub tool_call_limit: u32,
    /// Newline-delimited banned-term vocabulary. Loaded once at startup.
    pub sensitive_words_path: String,
    /// Directory the file tools are confined to.
    pub workspace_dir: String,
    pub db_path: String,
    pub log_level: LogLevel,
    pub version: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Returns a default `AgentConfig`. Fields with no sensible default are left
/// empty so callers can override them.
pub fn default_config() -> AgentConfig {
    AgentConfig {
        name: "automind".to_string(),
        inference_api_url: "https://api.openai.com".to_string(),
        inference_api_key: String::new(),
        inference_model: "gpt-4o".to_string(),
        max_tokens_per_call: 4096,
        max_steps: 10,
        error_on_budget_exhausted: false,
        tool_call_limit: 6,
        sensitive_words_path: "~/.automind/sensitive_words.txt".to_string(),
        workspace_dir: "~/.automind/workspace".to_string(),
        db_path: "~/.automind/state.db".to_string(),
        log_level: LogLevel::Info,
        version: "0.1.0".to_string(),
    }
}

// ─── Conversation ────────────────────────────────────────────────

/// Message kind. Every consumer matches on this exhaustively, so adding a
/// new kind is a compile-time-checked change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<InferenceToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Plain message with the given role and no tool payload.
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

// ─── Agent State ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Running,
    Finished,
    Error,
}

impl AgentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Finished | AgentStatus::Error)
    }
}

/// Externally observable trace of one think/act cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: u32,
    pub thought: String,
    pub action: String,
    pub tools: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub files: Vec<FileArtifact>,
}

/// Descriptor for a file produced by a tool during a step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileArtifact {
    pub path: String,
    pub bytes: u64,
}

/// Final result of one `AgentLoop::run` invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub status: AgentStatus,
    /// Never empty: the loop substitutes an explicit marker when no usable
    /// assistant text exists at termination.
    pub answer: String,
    /// True when the content gate rejected the goal before any model call.
    pub blocked: bool,
    pub steps: Vec<StepRecord>,
}

// ─── Tool System ─────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
    pub result: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Runtime context handed to every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    pub config: AgentConfig,
    /// Resolved absolute workspace directory the file tools operate in.
    pub workspace_dir: std::path::PathBuf,
}

// ─── Inference ───────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: InferenceToolCallFunction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceToolCallFunction {
    pub name: String,
    /// Raw JSON argument string as returned by the model.
    pub arguments: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResponse {
    pub id: String,
    pub model: String,
    pub message: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<InferenceToolCall>>,
    pub usage: TokenUsage,
    pub finish_reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InferenceOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<InferenceToolDefinition>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceToolDefinition {
    #[serde(rename = "type")]
    pub def_type: String,
    pub function: InferenceToolDefinitionFunction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceToolDefinitionFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The model-call collaborator. Always returns the same shape, even when the
/// model requests zero tool calls; failures are surfaced as `Err` and the
/// agent loop degrades to "no action" for that step.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        options: Option<InferenceOptions>,
    ) -> anyhow::Result<InferenceResponse>;

    fn get_default_model(&self) -> String;
}

// ─── Conversation Store ──────────────────────────────────────────

/// Durable conversation storage. The loop only needs ordered append and
/// ordered retrieval, optionally capped to the most recent N messages.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(
        &self,
        conversation_id: &str,
        messages: &[ChatMessage],
    ) -> anyhow::Result<()>;

    async fn load_recent(
        &self,
        conversation_id: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<ChatMessage>>;
}
