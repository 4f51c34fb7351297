//! narwhal runtime: session orchestration and agent chains.
//!
//! A [`ChatInterface`] is one conversation session. It resolves a model,
//! embeddings, and long-term memory through the
//! [`Registry`](registry::Registry), builds the history memory over the
//! conversation's persisted log, and drives turns through the
//! mode-specific [`Chain`].
//!
//! # Example
//!
//! ```rust,ignore
//! use memory::{ConversationLog, MemStore};
//! use runtime::{ChatInterface, ChatInterfaceInput, HistoryMode, PresetStore};
//!
//! let registry = Registry::new();
//! // ... register providers ...
//!
//! let preset = PresetStore::new(dir).default_preset()?;
//! let input = ChatInterfaceInput {
//!     chat_mode: ChatMode::Browsing,
//!     history_mode: HistoryMode::All,
//!     bot_name: "narwhal".into(),
//!     log: ConversationLog::new(store, "conversation-1"),
//!     system_prompts: preset.system_prompts(),
//!     long_memory: false,
//!     create_params: CreateParams::default(),
//!     mixed_model_name: "openai/gpt-3.5-turbo".into(),
//!     mixed_embeddings_name: None,
//!     mixed_vector_store_name: None,
//! };
//!
//! let mut session = ChatInterface::init(registry, input).await?;
//! let reply = session.chat("what's new in rust?").await?;
//! ```

pub use {
    chain::{BrowsingChain, Chain, ChatChain, FunctionChain, PluginChain},
    chat::{ChatInterface, ChatInterfaceInput, HistoryMode},
    parser::parse_action,
    preset::{PresetStore, PresetTemplate, parse_preset},
};

mod chain;
mod chat;
mod parser;
mod preset;
