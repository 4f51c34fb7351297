//! Fatal error taxonomy.

/// Errors that abort a turn or a session initialization.
///
/// Recoverable conditions (a failing tool invocation, malformed model
/// output) are represented as data fed back into the loop and never
/// surface through this enum.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No registered provider matched the requested name.
    #[error("no provider found for {kind} `{name}`")]
    ProviderNotFound {
        /// The provider kind ("model", "embeddings", "vector store").
        kind: &'static str,
        /// The requested mixed name.
        name: String,
    },

    /// The persisted message graph violates the linked-list invariant.
    #[error("corrupt history for conversation `{conversation}`: {detail}")]
    CorruptHistory {
        /// The conversation whose load failed.
        conversation: String,
        /// What the walk found.
        detail: String,
    },

    /// The agent loop hit its iteration cap without a final answer.
    #[error("tool loop exceeded {limit} iterations without a final answer")]
    ToolLoopExceeded {
        /// The documented cap for the chain that failed.
        limit: usize,
    },
}
