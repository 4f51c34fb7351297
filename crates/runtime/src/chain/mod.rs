//! Agent chains: the state machines driving one conversation turn.
//!
//! A closed set of variants selected by chat mode, each exposing the
//! single `call` capability: take the user message, run to a final
//! answer (possibly through an internal tool loop), persist the
//! exchange, and return the assistant message. Shared scaffolding lives
//! in free helpers here rather than in a type hierarchy.

pub use {
    browsing::BrowsingChain, chat::ChatChain, function::FunctionChain, plugin::PluginChain,
};

use anyhow::Result;
use memory::HistoryMemory;
use ncore::{ChatMessage, ChatModel, Role, default_context_limit};

mod browsing;
mod chat;
mod function;
mod plugin;

/// System prompt used when the session carries none.
pub(crate) const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a large language model. Carefully heed the user's instructions.";

/// One turn of conversation, dispatched by chat mode.
pub enum Chain {
    /// Single-shot chat, no tools.
    Chat(ChatChain),
    /// Text-protocol browsing loop.
    Browsing(BrowsingChain),
    /// Structured function-calling browsing loop.
    FunctionCalling(FunctionChain),
    /// Function-calling loop over every registered tool.
    Plugin(PluginChain),
}

impl Chain {
    /// Run one full conversation turn and return the assistant message.
    ///
    /// The exchange is persisted into `history` only when the turn
    /// succeeds; a failed turn leaves prior state valid.
    pub async fn call(
        &self,
        history: &mut HistoryMemory,
        message: &ChatMessage,
    ) -> Result<ChatMessage> {
        match self {
            Chain::Chat(chain) => chain.call(history, message).await,
            Chain::Browsing(chain) => chain.call(history, message).await,
            Chain::FunctionCalling(chain) => chain.call(history, message).await,
            Chain::Plugin(chain) => chain.call(history, message).await,
        }
    }
}

/// Trim the oldest non-system messages until the estimated token count
/// fits the model's context budget. The system prompt is never dropped.
pub(crate) fn fit_to_budget(model: &dyn ChatModel, messages: &mut Vec<ChatMessage>) {
    let limit = default_context_limit(model.model_type());
    loop {
        let used: usize = messages
            .iter()
            .map(|message| model.get_num_tokens(&message.content))
            .sum();
        if used <= limit {
            return;
        }
        let Some(oldest) = messages.iter().position(|message| message.role != Role::System)
        else {
            return;
        };
        messages.remove(oldest);
    }
}
