//! automind - task-oriented agent runtime
//!
//! Given a user goal, the runtime repeatedly decides whether to reason
//! further or invoke a tool, executes the tool batch, and terminates when
//! the model calls the `terminate` sentinel or the step budget runs out.
//! A banned-term gate rejects goals before any model call, and a
//! per-conversation limiter caps tool usage.

pub mod agent;
pub mod config;
pub mod error;
pub mod inference;
pub mod state;
pub mod types;
