//! The typed action parsed from one model turn.

use serde_json::Value;

/// One decision parsed from a model reply.
///
/// Transient: drives a single loop iteration and is never persisted.
/// Protocol violations become [`Action::Error`] so the loop's
/// self-correction path stays reachable instead of the turn crashing.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The final user-facing answer; terminates the loop.
    Chat {
        /// The answer text.
        response: String,
    },

    /// Invoke a named tool with its arguments.
    Tool {
        /// The tool name as emitted by the model.
        name: String,
        /// The argument payload, passed through as-is.
        args: Value,
    },

    /// The reply did not match the protocol.
    Error {
        /// The raw reply, fed back for self-correction.
        detail: String,
    },
}
