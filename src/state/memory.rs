//! In-Memory Conversation Store
//!
//! HashMap-backed store. Default for tests and for runs that do not need
//! durability.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ChatMessage, ConversationStore};

#[derive(Default)]
pub struct MemoryStore {
    conversations: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn append(&self, conversation_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let mut conversations = self.conversations.lock().unwrap();
        conversations
            .entry(conversation_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn load_recent(&self, conversation_id: &str, limit: u32) -> Result<Vec<ChatMessage>> {
        let conversations = self.conversations.lock().unwrap();
        let messages = match conversations.get(conversation_id) {
            Some(messages) => messages,
            None => return Ok(Vec::new()),
        };
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatRole;

    #[tokio::test]
    async fn test_append_and_load() {
        let store = MemoryStore::new();
        store
            .append(
                "conv-1",
                &[
                    ChatMessage::text(ChatRole::User, "hello"),
                    ChatMessage::text(ChatRole::Assistant, "hi"),
                ],
            )
            .await
            .unwrap();

        let loaded = store.load_recent("conv-1", 10).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "hello");
    }

    #[tokio::test]
    async fn test_limit_takes_tail() {
        let store = MemoryStore::new();
        for i in 0..4 {
            store
                .append(
                    "conv-1",
                    &[ChatMessage::text(ChatRole::User, format!("m{}", i))],
                )
                .await
                .unwrap();
        }

        let loaded = store.load_recent("conv-1", 2).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "m2");
        assert_eq!(loaded[1].content, "m3");
    }

    #[tokio::test]
    async fn test_missing_conversation_is_empty() {
        let store = MemoryStore::new();
        assert!(store.load_recent("nope", 5).await.unwrap().is_empty());
    }
}
