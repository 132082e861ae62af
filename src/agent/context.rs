//! Context Assembly
//!
//! Builds the message array for each inference call and extracts the final
//! answer from the conversation history at termination.

use crate::agent::system_prompt::{build_step_info, NEXT_STEP_PROMPT, SYSTEM_PROMPT};
use crate::agent::tools::TERMINATE_TOOL;
use crate::types::{ChatMessage, ChatRole};

/// Marker substituted when no usable assistant text exists at termination.
pub const NO_ANSWER_MARKER: &str = "[no answer produced]";

/// Build the message array for the next inference call: standing system
/// prompt, step-counter preamble, full history, closing nudge.
pub fn build_request_messages(
    history: &[ChatMessage],
    current_step: u32,
    max_steps: u32,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::text(ChatRole::System, SYSTEM_PROMPT));
    messages.push(ChatMessage::text(
        ChatRole::System,
        build_step_info(current_step, max_steps),
    ));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::text(ChatRole::User, NEXT_STEP_PROMPT));
    messages
}

/// True when the message is termination meta-commentary rather than an
/// answer: text that only talks about calling the sentinel.
fn is_termination_commentary(message: &ChatMessage) -> bool {
    message.content.contains(TERMINATE_TOOL)
        && message.content.len() < 200
        && message.tool_calls.is_some()
}

/// Extract the final answer from the history: the most recent non-empty
/// assistant text that is not termination meta-commentary. Falls back to the
/// explicit no-answer marker so the caller never sees an empty string.
pub fn extract_final_answer(history: &[ChatMessage]) -> String {
    history
        .iter()
        .rev()
        .find(|m| {
            m.role == ChatRole::Assistant
                && !m.content.trim().is_empty()
                && !is_termination_commentary(m)
        })
        .map(|m| m.content.clone())
        .unwrap_or_else(|| NO_ANSWER_MARKER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InferenceToolCall, InferenceToolCallFunction};

    fn assistant(content: &str) -> ChatMessage {
        ChatMessage::text(ChatRole::Assistant, content)
    }

    fn terminate_call() -> InferenceToolCall {
        InferenceToolCall {
            id: "tc_t".to_string(),
            call_type: "function".to_string(),
            function: InferenceToolCallFunction {
                name: TERMINATE_TOOL.to_string(),
                arguments: r#"{"status":"success"}"#.to_string(),
            },
        }
    }

    #[test]
    fn test_request_shape() {
        let history = vec![ChatMessage::text(ChatRole::User, "count to three")];
        let messages = build_request_messages(&history, 1, 10);

        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert!(messages[1].content.contains("Step 1 of 10"));
        assert_eq!(messages[2].content, "count to three");
        assert_eq!(messages.last().unwrap().content, NEXT_STEP_PROMPT);
    }

    #[test]
    fn test_final_answer_is_latest_assistant_text() {
        let history = vec![
            ChatMessage::text(ChatRole::User, "goal"),
            assistant("working on it"),
            ChatMessage::text(ChatRole::Tool, "tool output"),
            assistant("the answer is 42"),
        ];
        assert_eq!(extract_final_answer(&history), "the answer is 42");
    }

    #[test]
    fn test_final_answer_skips_termination_commentary() {
        let mut commentary = assistant("Calling terminate now.");
        commentary.tool_calls = Some(vec![terminate_call()]);

        let history = vec![
            ChatMessage::text(ChatRole::User, "goal"),
            assistant("the capital of France is Paris"),
            commentary,
        ];
        assert_eq!(
            extract_final_answer(&history),
            "the capital of France is Paris"
        );
    }

    #[test]
    fn test_final_answer_skips_empty_messages() {
        let history = vec![
            ChatMessage::text(ChatRole::User, "goal"),
            assistant("real answer"),
            assistant("   "),
        ];
        assert_eq!(extract_final_answer(&history), "real answer");
    }

    #[test]
    fn test_no_answer_marker_when_nothing_usable() {
        let history = vec![ChatMessage::text(ChatRole::User, "goal")];
        assert_eq!(extract_final_answer(&history), NO_ANSWER_MARKER);
        assert!(!extract_final_answer(&history).is_empty());
    }
}
