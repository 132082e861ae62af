//! Conversation Persistence
//!
//! `ConversationStore` implementations: in-memory and SQLite.

pub mod database;
pub mod memory;
pub mod schema;

pub use database::SqliteStore;
pub use memory::MemoryStore;
