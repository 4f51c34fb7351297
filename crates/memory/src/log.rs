//! Parent-pointer conversation log.

use crate::{ConversationRecord, MessageRecord, Store};
use anyhow::Result;
use ncore::{ChatMessage, Error, FunctionCall, Role};
use serde_json::{Map, Value, json};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use ulid::Ulid;

/// Persistent, append-only message log for one conversation.
///
/// Messages are linked by parent pointers; ordered history is
/// reconstructed by walking from `latest_id` back to the root on every
/// read. The conversation row is created lazily on first contact.
pub struct ConversationLog {
    store: Arc<dyn Store>,
    conversation_id: String,
    extra_params: Map<String, Value>,
    latest_id: Option<String>,
    loaded: bool,
}

impl ConversationLog {
    /// Create a log over the given store for the given conversation id.
    pub fn new(store: Arc<dyn Store>, conversation_id: impl Into<String>) -> Self {
        Self {
            store,
            conversation_id: conversation_id.into(),
            extra_params: Map::new(),
            latest_id: None,
            loaded: false,
        }
    }

    /// Seed the opaque metadata used when the conversation row is first
    /// created.
    pub fn with_extra_params(mut self, extra_params: Map<String, Value>) -> Self {
        self.extra_params = extra_params;
        self
    }

    /// The owning conversation id.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The conversation's opaque metadata.
    pub fn extra_params(&self) -> &Map<String, Value> {
        &self.extra_params
    }

    /// Load the conversation row, creating it if absent. Idempotent.
    pub async fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        match self.store.conversation(&self.conversation_id).await? {
            Some(record) => {
                self.extra_params = record.extra_params;
                self.latest_id = record.latest_id;
            }
            None => self.persist_conversation().await?,
        }

        self.loaded = true;
        Ok(())
    }

    /// Reload from the store and return the ordered history.
    pub async fn messages(&mut self) -> Result<Vec<ChatMessage>> {
        self.load().await?;
        let records = self.reconstruct().await?;
        Ok(records.iter().map(to_chat_message).collect())
    }

    /// Append a human message.
    pub async fn add_user_message(&mut self, text: impl Into<String>) -> Result<()> {
        self.append(&ChatMessage::human(text)).await
    }

    /// Append an AI message.
    pub async fn add_ai_message(&mut self, text: impl Into<String>) -> Result<()> {
        self.append(&ChatMessage::ai(text)).await
    }

    /// Persist a message with `parent = latest_id` and advance the head.
    pub async fn append(&mut self, message: &ChatMessage) -> Result<()> {
        self.load().await?;

        let record = MessageRecord {
            id: Ulid::new().to_string(),
            text: message.content.clone(),
            role: message.role.as_str().to_owned(),
            parent: self.latest_id.clone(),
            conversation: self.conversation_id.clone(),
            metadata: to_metadata(message)?,
        };

        self.store.upsert_message(record.clone()).await?;
        self.latest_id = Some(record.id);
        self.persist_conversation().await
    }

    /// Delete every message and reset the head. Idempotent.
    pub async fn clear(&mut self) -> Result<()> {
        self.store.remove_messages(&self.conversation_id).await?;
        self.latest_id = None;
        self.loaded = true;
        self.persist_conversation().await
    }

    /// Remove the conversation row together with its messages.
    pub async fn delete(&mut self) -> Result<()> {
        self.store.remove_messages(&self.conversation_id).await?;
        self.store.remove_conversation(&self.conversation_id).await?;
        self.latest_id = None;
        self.loaded = false;
        Ok(())
    }

    /// Overwrite the opaque metadata and persist immediately.
    pub async fn update_extra_params(&mut self, extra_params: Map<String, Value>) -> Result<()> {
        self.load().await?;
        self.extra_params = extra_params;
        self.persist_conversation().await
    }

    /// Read all rows, index them by id once, then walk the parent chain
    /// from the head. O(n) for n messages.
    async fn reconstruct(&self) -> Result<Vec<MessageRecord>> {
        let rows = self.store.messages(&self.conversation_id).await?;

        let Some(latest) = self.latest_id.as_deref() else {
            if rows.is_empty() {
                return Ok(Vec::new());
            }
            return Err(self.corrupt("latest id is null but messages exist"))?;
        };

        let index: HashMap<&str, &MessageRecord> =
            rows.iter().map(|row| (row.id.as_str(), row)).collect();

        let mut ordered = Vec::with_capacity(rows.len());
        let mut seen = HashSet::with_capacity(rows.len());
        let mut cursor = Some(latest);

        while let Some(id) = cursor {
            let Some(row) = index.get(id) else {
                return Err(self.corrupt(format!("message `{id}` referenced but not stored")))?;
            };
            if !seen.insert(id) {
                return Err(self.corrupt(format!("parent cycle through message `{id}`")))?;
            }
            ordered.push((*row).clone());
            cursor = row.parent.as_deref();
        }

        // A chain shorter than the row count means fan-out: some rows
        // are unreachable from the head.
        if ordered.len() != rows.len() {
            return Err(self.corrupt(format!(
                "parent chain covers {} of {} messages",
                ordered.len(),
                rows.len()
            )))?;
        }

        ordered.reverse();
        Ok(ordered)
    }

    async fn persist_conversation(&self) -> Result<()> {
        self.store
            .upsert_conversation(ConversationRecord {
                id: self.conversation_id.clone(),
                extra_params: self.extra_params.clone(),
                latest_id: self.latest_id.clone(),
            })
            .await
    }

    fn corrupt(&self, detail: impl Into<String>) -> Error {
        Error::CorruptHistory {
            conversation: self.conversation_id.clone(),
            detail: detail.into(),
        }
    }
}

/// Serialize the parts of a message the flat row cannot carry.
fn to_metadata(message: &ChatMessage) -> Result<Option<String>> {
    if message.function_call.is_none() && message.name.is_empty() {
        return Ok(None);
    }

    let mut bag = Map::new();
    if let Some(call) = &message.function_call {
        bag.insert("function_call".into(), serde_json::to_value(call)?);
    }
    if !message.name.is_empty() {
        bag.insert("name".into(), json!(message.name));
    }
    Ok(Some(serde_json::to_string(&Value::Object(bag))?))
}

fn to_chat_message(record: &MessageRecord) -> ChatMessage {
    let bag: Map<String, Value> = record
        .metadata
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();

    let function_call = bag
        .get("function_call")
        .and_then(|value| serde_json::from_value::<FunctionCall>(value.clone()).ok());
    let name = bag
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    ChatMessage {
        content: record.text.clone(),
        name,
        role: Role::from(record.role.clone()),
        function_call,
    }
}
