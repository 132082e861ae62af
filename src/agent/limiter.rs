//! Tool Call Limiter
//!
//! Per-conversation governor over tool usage. Once a conversation's history
//! carries `cap` tool-result messages, the next outgoing request gets a
//! steering system message telling the model to stop calling tools and
//! answer with what it already has. The request is rewritten, never
//! rejected: an unbounded retry hazard becomes a bounded one without raising
//! an error to the caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::types::{ChatMessage, ChatRole};

/// Default cap on tool-result messages per conversation.
pub const DEFAULT_TOOL_CALL_LIMIT: u32 = 6;

/// Gate entries for conversations that never finish cleanly are evicted
/// after this long without being touched.
const GATE_TTL: Duration = Duration::from_secs(60 * 60);

/// Steering message injected once the cap is reached.
pub const LIMIT_REACHED_MESSAGE: &str =
    "System notice: you have gathered enough information. Answer now using \
     what you already have. Do not call any more tools; give your final \
     answer immediately.";

struct GateEntry {
    injected: bool,
    touched: Instant,
}

/// Per-conversation "steering instruction already injected" flags.
///
/// Shared by every concurrently running conversation, so access goes through
/// a mutex. Entries are removed on clean completion and additionally
/// TTL-evicted so abandoned conversations cannot grow the map forever.
struct SessionGateStore {
    entries: Mutex<HashMap<String, GateEntry>>,
    ttl: Duration,
}

impl SessionGateStore {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn is_injected(&self, conversation_id: &str) -> bool {
        let entries = self.entries.lock().unwrap();
        entries
            .get(conversation_id)
            .map(|e| e.injected)
            .unwrap_or(false)
    }

    fn mark_injected(&self, conversation_id: &str) {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries.retain(|_, e| now.duration_since(e.touched) < self.ttl);
        entries.insert(
            conversation_id.to_string(),
            GateEntry {
                injected: true,
                touched: now,
            },
        );
    }

    fn clear(&self, conversation_id: &str) {
        self.entries.lock().unwrap().remove(conversation_id);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// The limiter itself. One instance is shared across all conversations.
pub struct ToolCallLimiter {
    cap: u32,
    gate: SessionGateStore,
}

impl ToolCallLimiter {
    pub fn new(cap: u32) -> Self {
        Self::with_ttl(cap, GATE_TTL)
    }

    fn with_ttl(cap: u32, ttl: Duration) -> Self {
        Self {
            cap,
            gate: SessionGateStore::new(ttl),
        }
    }

    /// Count tool-result messages in the outgoing history.
    fn count_tool_messages(messages: &[ChatMessage]) -> u32 {
        messages
            .iter()
            .filter(|m| match m.role {
                ChatRole::Tool => true,
                ChatRole::System | ChatRole::User | ChatRole::Assistant => false,
            })
            .count() as u32
    }

    /// Inspect (and possibly rewrite) the outgoing request before the model
    /// call. At or over the cap, the steering message is prepended exactly
    /// once per overrun; under the cap, any stale injected mark is cleared so
    /// a conversation that falls back under the cap can trigger again later.
    pub fn before(&self, messages: &mut Vec<ChatMessage>, conversation_id: &str) {
        let tool_message_count = Self::count_tool_messages(messages);

        if tool_message_count >= self.cap {
            if !self.gate.is_injected(conversation_id) {
                info!(
                    conversation_id,
                    tool_message_count, "tool-call cap reached, injecting steering message"
                );
                messages.insert(0, ChatMessage::text(ChatRole::System, LIMIT_REACHED_MESSAGE));
                self.gate.mark_injected(conversation_id);
            }
        } else {
            self.gate.clear(conversation_id);
        }
    }

    /// Inspect the model's finish reason after the call. Only a clean stop
    /// clears the gate entry, so the injected flag neither leaks into future
    /// conversations nor re-injects within the same overrun.
    pub fn after(&self, finish_reason: &str, conversation_id: &str) {
        if finish_reason.eq_ignore_ascii_case("stop") {
            debug!(conversation_id, "clean stop, clearing tool-call gate");
            self.gate.clear(conversation_id);
        }
    }
}
