//! Agent Runtime
//!
//! The think/act loop and its collaborators: tool registry and dispatch,
//! the tool-call limiter, the content gate, prompt text, context assembly.

pub mod agent_loop;
pub mod context;
pub mod invoker;
pub mod limiter;
pub mod system_prompt;
pub mod tools;
pub mod word_filter;
