//! Tests for the parent-pointer conversation log.

use memory::{ConversationLog, MemStore, MessageRecord, Store};
use ncore::{ChatMessage, Error, FunctionCall, Role};
use serde_json::json;
use std::sync::Arc;

fn log_over(store: &MemStore, id: &str) -> ConversationLog {
    ConversationLog::new(Arc::new(store.clone()), id)
}

fn raw_message(id: &str, parent: Option<&str>, conversation: &str) -> MessageRecord {
    MessageRecord {
        id: id.into(),
        text: format!("text-{id}"),
        role: "human".into(),
        parent: parent.map(Into::into),
        conversation: conversation.into(),
        metadata: None,
    }
}

async fn seed_conversation(store: &MemStore, id: &str, latest: Option<&str>) {
    store
        .upsert_conversation(memory::ConversationRecord {
            id: id.into(),
            extra_params: Default::default(),
            latest_id: latest.map(Into::into),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn history_round_trip_preserves_append_order() {
    let store = MemStore::new();
    let mut log = log_over(&store, "c1");

    log.add_user_message("hi").await.unwrap();
    log.add_ai_message("hello").await.unwrap();
    log.add_user_message("bye").await.unwrap();

    let messages = log.messages().await.unwrap();
    let texts: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, ["hi", "hello", "bye"]);
    assert_eq!(messages[0].role, Role::Human);
    assert_eq!(messages[1].role, Role::Ai);
    assert_eq!(messages[2].role, Role::Human);
}

#[tokio::test]
async fn history_survives_a_new_session() {
    let store = MemStore::new();
    {
        let mut log = log_over(&store, "c1");
        log.add_user_message("first").await.unwrap();
        log.add_ai_message("second").await.unwrap();
    }

    let mut resumed = log_over(&store, "c1");
    let messages = resumed.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "first");
    assert_eq!(messages[1].content, "second");
}

#[tokio::test]
async fn dangling_latest_pointer_is_corrupt() {
    let store = MemStore::new();
    seed_conversation(&store, "c1", Some("missing")).await;
    store
        .upsert_message(raw_message("m1", None, "c1"))
        .await
        .unwrap();

    let err = log_over(&store, "c1").messages().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CorruptHistory { .. })
    ));
}

#[tokio::test]
async fn null_latest_with_messages_is_corrupt() {
    let store = MemStore::new();
    seed_conversation(&store, "c1", None).await;
    store
        .upsert_message(raw_message("m1", None, "c1"))
        .await
        .unwrap();

    let err = log_over(&store, "c1").messages().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CorruptHistory { .. })
    ));
}

#[tokio::test]
async fn fan_out_is_corrupt() {
    let store = MemStore::new();
    // m2 and m3 both claim m1 as parent; the walk from m3 can never
    // reach m2.
    store
        .upsert_message(raw_message("m1", None, "c1"))
        .await
        .unwrap();
    store
        .upsert_message(raw_message("m2", Some("m1"), "c1"))
        .await
        .unwrap();
    store
        .upsert_message(raw_message("m3", Some("m1"), "c1"))
        .await
        .unwrap();
    seed_conversation(&store, "c1", Some("m3")).await;

    let err = log_over(&store, "c1").messages().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CorruptHistory { .. })
    ));
}

#[tokio::test]
async fn parent_cycle_is_corrupt() {
    let store = MemStore::new();
    store
        .upsert_message(raw_message("m1", Some("m2"), "c1"))
        .await
        .unwrap();
    store
        .upsert_message(raw_message("m2", Some("m1"), "c1"))
        .await
        .unwrap();
    seed_conversation(&store, "c1", Some("m1")).await;

    let err = log_over(&store, "c1").messages().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CorruptHistory { .. })
    ));
}

#[tokio::test]
async fn clear_is_idempotent() {
    let store = MemStore::new();
    let mut log = log_over(&store, "c1");
    log.add_user_message("hi").await.unwrap();
    log.add_ai_message("hello").await.unwrap();

    log.clear().await.unwrap();
    assert!(log.messages().await.unwrap().is_empty());

    log.clear().await.unwrap();
    assert!(log.messages().await.unwrap().is_empty());

    let record = store.conversation("c1").await.unwrap().unwrap();
    assert_eq!(record.latest_id, None);
}

#[tokio::test]
async fn append_after_clear_restarts_the_chain() {
    let store = MemStore::new();
    let mut log = log_over(&store, "c1");
    log.add_user_message("old").await.unwrap();
    log.clear().await.unwrap();

    log.add_user_message("new").await.unwrap();
    let messages = log.messages().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "new");
}

#[tokio::test]
async fn delete_sweeps_messages() {
    let store = MemStore::new();
    let mut log = log_over(&store, "c1");
    log.add_user_message("hi").await.unwrap();

    log.delete().await.unwrap();
    assert!(store.conversation("c1").await.unwrap().is_none());
    assert!(store.messages("c1").await.unwrap().is_empty());
}

#[tokio::test]
async fn update_extra_params_persists_immediately() {
    let store = MemStore::new();
    let mut log = log_over(&store, "c1");

    let mut params = serde_json::Map::new();
    params.insert("model".into(), json!("openai/gpt-3.5-turbo"));
    log.update_extra_params(params.clone()).await.unwrap();

    let record = store.conversation("c1").await.unwrap().unwrap();
    assert_eq!(record.extra_params, params);
}

#[tokio::test]
async fn function_call_metadata_round_trips() {
    let store = MemStore::new();
    let mut log = log_over(&store, "c1");

    let mut message = ChatMessage::ai("");
    message.function_call = Some(FunctionCall {
        name: "search".into(),
        arguments: r#"{"keyword":"rust"}"#.into(),
    });
    log.append(&message).await.unwrap();

    let loaded = log.messages().await.unwrap();
    let call = loaded[0].function_call.as_ref().unwrap();
    assert_eq!(call.name, "search");
    assert_eq!(call.arguments, r#"{"keyword":"rust"}"#);
}
