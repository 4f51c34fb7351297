//! Abstract persistence contract and the in-process store.

use anyhow::Result;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// A persisted conversation row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationRecord {
    /// The conversation id.
    pub id: String,

    /// Opaque key-value metadata (model binding, preset, ...).
    pub extra_params: Map<String, Value>,

    /// Pointer to the newest message; `None` iff the conversation is empty.
    pub latest_id: Option<String>,
}

/// A persisted message row. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    /// Unique message id.
    pub id: String,

    /// The message text.
    pub text: String,

    /// The role string (`system`, `human`, `ai`, `function`, ...).
    pub role: String,

    /// Id of the preceding message; `None` for the first message.
    pub parent: Option<String>,

    /// The owning conversation id.
    pub conversation: String,

    /// Serialized key-value bag (function-call descriptors and the like).
    pub metadata: Option<String>,
}

/// The two-table persistence contract the memory layer consumes.
///
/// Rows are keyed by primary id. Referential integrity of parent
/// pointers is upheld by construction in [`ConversationLog`], not
/// enforced here.
///
/// [`ConversationLog`]: crate::ConversationLog
pub trait Store: Send + Sync {
    /// Fetch a conversation row by id.
    fn conversation<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ConversationRecord>>>;

    /// Insert or replace a conversation row.
    fn upsert_conversation(&self, record: ConversationRecord) -> BoxFuture<'_, Result<()>>;

    /// Remove a conversation row.
    fn remove_conversation<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Fetch all message rows of a conversation, in no particular order.
    fn messages<'a>(&'a self, conversation: &'a str)
    -> BoxFuture<'a, Result<Vec<MessageRecord>>>;

    /// Insert or replace a message row.
    fn upsert_message(&self, record: MessageRecord) -> BoxFuture<'_, Result<()>>;

    /// Remove every message row of a conversation.
    fn remove_messages<'a>(&'a self, conversation: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// In-process store backed by hash maps.
///
/// Useful for tests and as a local cache shape for persistent backends.
#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, ConversationRecord>,
    messages: HashMap<String, MessageRecord>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn conversation<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ConversationRecord>>> {
        Box::pin(async move {
            Ok(self.inner.lock().unwrap().conversations.get(id).cloned())
        })
    }

    fn upsert_conversation(&self, record: ConversationRecord) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.inner
                .lock()
                .unwrap()
                .conversations
                .insert(record.id.clone(), record);
            Ok(())
        })
    }

    fn remove_conversation<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.inner.lock().unwrap().conversations.remove(id);
            Ok(())
        })
    }

    fn messages<'a>(
        &'a self,
        conversation: &'a str,
    ) -> BoxFuture<'a, Result<Vec<MessageRecord>>> {
        Box::pin(async move {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .messages
                .values()
                .filter(|record| record.conversation == conversation)
                .cloned()
                .collect())
        })
    }

    fn upsert_message(&self, record: MessageRecord) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.inner
                .lock()
                .unwrap()
                .messages
                .insert(record.id.clone(), record);
            Ok(())
        })
    }

    fn remove_messages<'a>(&'a self, conversation: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.inner
                .lock()
                .unwrap()
                .messages
                .retain(|_, record| record.conversation != conversation);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, conversation: &str) -> MessageRecord {
        MessageRecord {
            id: id.into(),
            text: String::new(),
            role: "human".into(),
            parent: None,
            conversation: conversation.into(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn conversation_round_trip() {
        let store = MemStore::new();
        assert!(store.conversation("c1").await.unwrap().is_none());

        let record = ConversationRecord {
            id: "c1".into(),
            ..Default::default()
        };
        store.upsert_conversation(record.clone()).await.unwrap();
        assert_eq!(store.conversation("c1").await.unwrap(), Some(record));

        store.remove_conversation("c1").await.unwrap();
        assert!(store.conversation("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn messages_scoped_to_conversation() {
        let store = MemStore::new();
        store.upsert_message(message("m1", "c1")).await.unwrap();
        store.upsert_message(message("m2", "c1")).await.unwrap();
        store.upsert_message(message("m3", "c2")).await.unwrap();

        assert_eq!(store.messages("c1").await.unwrap().len(), 2);
        assert_eq!(store.messages("c2").await.unwrap().len(), 1);

        store.remove_messages("c1").await.unwrap();
        assert!(store.messages("c1").await.unwrap().is_empty());
        assert_eq!(store.messages("c2").await.unwrap().len(), 1);
    }
}
