//! Conversation persistence and history memory for narwhal sessions.
//!
//! Three layers, bottom up:
//!
//! - [`Store`] — the abstract two-table persistence contract
//!   (conversations + messages) with [`MemStore`] as the bundled
//!   in-process implementation.
//! - [`ConversationLog`] — a per-conversation append-only message log
//!   linked by parent pointers, reconstructing ordered history from the
//!   head pointer on every read.
//! - [`HistoryMemory`] / [`VectorMemory`] — what the chains consume: the
//!   prior-turn feed (verbatim or summarized) and long-term recall.

pub use {
    history::HistoryMemory,
    log::ConversationLog,
    store::{ConversationRecord, MemStore, MessageRecord, Store},
    vector::VectorMemory,
};

mod history;
mod log;
mod store;
mod vector;
