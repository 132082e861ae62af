//! SQLite Conversation Store
//!
//! Durable conversation history via rusqlite. Single process, synchronous
//! access guarded by a mutex; statements are short and never held across an
//! await point.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};

use crate::types::{ChatMessage, ChatRole, ConversationStore, InferenceToolCall};

use super::schema::{CREATE_TABLES, SCHEMA_VERSION};

/// SQLite-backed conversation store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and initialize the schema.
    pub fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create db directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database: {db_path}"))?;

        // WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(CREATE_TABLES)
            .context("failed to create tables")?;
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
            params![SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Total messages stored for a conversation.
    pub fn message_count(&self, conversation_id: &str) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn append(&self, conversation_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for msg in messages {
            let tool_calls_json = msg
                .tool_calls
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            tx.execute(
                "INSERT INTO messages (conversation_id, role, content, name, tool_calls, tool_call_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    conversation_id,
                    role_to_str(msg.role),
                    msg.content,
                    msg.name,
                    tool_calls_json,
                    msg.tool_call_id,
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn load_recent(&self, conversation_id: &str, limit: u32) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT role, content, name, tool_calls, tool_call_id
             FROM messages WHERE conversation_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let mut messages: Vec<ChatMessage> = stmt
            .query_map(params![conversation_id, limit], |row| {
                let role_str: String = row.get(0)?;
                let tool_calls_json: Option<String> = row.get(3)?;
                let tool_calls: Option<Vec<InferenceToolCall>> = tool_calls_json
                    .as_deref()
                    .and_then(|s| serde_json::from_str(s).ok());
                Ok(ChatMessage {
                    role: role_from_str(&role_str),
                    content: row.get(1)?,
                    name: row.get(2)?,
                    tool_calls,
                    tool_call_id: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}

fn role_to_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    }
}

fn role_from_str(s: &str) -> ChatRole {
    match s {
        "system" => ChatRole::System,
        "user" => ChatRole::User,
        "tool" => ChatRole::Tool,
        _ => ChatRole::Assistant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: ChatRole, content: &str) -> ChatMessage {
        ChatMessage::text(role, content)
    }

    #[tokio::test]
    async fn test_append_and_load_preserve_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append(
                "conv-1",
                &[
                    msg(ChatRole::User, "first"),
                    msg(ChatRole::Assistant, "second"),
                    msg(ChatRole::User, "third"),
                ],
            )
            .await
            .unwrap();

        let loaded = store.load_recent("conv-1", 10).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].content, "first");
        assert_eq!(loaded[2].content, "third");
        assert_eq!(loaded[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_limit_keeps_most_recent() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .append("conv-1", &[msg(ChatRole::User, &format!("m{}", i))])
                .await
                .unwrap();
        }

        let loaded = store.load_recent("conv-1", 2).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "m3");
        assert_eq!(loaded[1].content, "m4");
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append("conv-a", &[msg(ChatRole::User, "a")])
            .await
            .unwrap();
        store
            .append("conv-b", &[msg(ChatRole::User, "b")])
            .await
            .unwrap();

        let a = store.load_recent("conv-a", 10).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "a");
        assert_eq!(store.message_count("conv-b").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tool_message_fields_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut tool_msg = msg(ChatRole::Tool, "result text");
        tool_msg.tool_call_id = Some("tc_1".to_string());
        tool_msg.name = Some("read_file".to_string());

        store.append("conv-1", &[tool_msg]).await.unwrap();

        let loaded = store.load_recent("conv-1", 1).await.unwrap();
        assert_eq!(loaded[0].role, ChatRole::Tool);
        assert_eq!(loaded[0].tool_call_id.as_deref(), Some("tc_1"));
        assert_eq!(loaded[0].name.as_deref(), Some("read_file"));
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        let loaded = store.load_recent("nope", 10).await.unwrap();
        assert!(loaded.is_empty());
    }
}
