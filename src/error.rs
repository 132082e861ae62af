//! Error Taxonomy
//!
//! Fatal initialization failures get typed variants; everything recoverable
//! inside a run (model-call failures, tool failures, malformed decisions) is
//! absorbed by the agent loop and never reaches the caller as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The banned-term vocabulary could not be loaded. Fatal at startup;
    /// the runtime must not start without its content gate.
    #[error("failed to load sensitive-word vocabulary from {path}: {source}")]
    VocabularyLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The agent was asked to run while not idle.
    #[error("agent is {0:?}, expected idle")]
    NotIdle(crate::types::AgentStatus),

    /// The workspace directory could not be created or resolved.
    #[error("failed to prepare workspace directory {path}: {source}")]
    Workspace {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
