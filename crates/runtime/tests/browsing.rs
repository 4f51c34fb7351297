//! Tests for the text-protocol browsing loop.

use memory::{ConversationLog, HistoryMemory, MemStore};
use ncore::testing::{StubModel, StubTool};
use ncore::{ChatMessage, Error, Role, Tool};
use runtime::BrowsingChain;
use std::sync::Arc;

const CHAT_OK: &str = r#"{"tool": "chat", "args": {"response": "ok"}}"#;
const SEARCH: &str = r#"{"tool": "search", "args": {"keyword": "rust"}}"#;

fn history(store: &MemStore) -> HistoryMemory {
    HistoryMemory::buffer(ConversationLog::new(Arc::new(store.clone()), "c1"))
}

fn chain_with(model: &Arc<StubModel>, tools: Vec<Arc<dyn Tool>>) -> BrowsingChain {
    BrowsingChain::new(model.clone(), tools, vec![ChatMessage::system("Be helpful.")])
}

#[tokio::test]
async fn chat_action_terminates_in_one_iteration() {
    let store = MemStore::new();
    let model = Arc::new(StubModel::texts(&[CHAT_OK]));
    let chain = chain_with(&model, vec![]);

    let reply = chain
        .call(&mut history(&store), &ChatMessage::human("hi"))
        .await
        .unwrap();

    assert_eq!(reply.content, "ok");
    assert_eq!(reply.role, Role::Ai);
    assert_eq!(model.calls(), 1);

    // The exchange was persisted as one user/AI pair.
    let mut log = ConversationLog::new(Arc::new(store.clone()), "c1");
    let messages = log.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].content, "ok");
}

#[tokio::test]
async fn search_action_invokes_the_tool_and_loops() {
    let store = MemStore::new();
    let model = Arc::new(StubModel::texts(&[SEARCH, CHAT_OK]));
    let tool = Arc::new(StubTool::new("search-web", "the rust language"));
    let chain = chain_with(&model, vec![tool.clone()]);

    let reply = chain
        .call(&mut history(&store), &ChatMessage::human("what is rust?"))
        .await
        .unwrap();

    assert_eq!(reply.content, "ok");
    assert_eq!(model.calls(), 2);
    assert_eq!(tool.calls(), 1);
    assert_eq!(tool.received()[0]["keyword"], "rust");

    // The second invocation saw the observation as a system message.
    let second = &model.requests()[1];
    assert!(second.iter().any(|m| {
        m.role == Role::System && m.content.contains("Tool search-web returned: the rust language")
    }));
}

#[tokio::test]
async fn input_is_folded_into_history_after_iteration_zero() {
    let store = MemStore::new();
    let model = Arc::new(StubModel::texts(&[SEARCH, CHAT_OK]));
    let tool = Arc::new(StubTool::new("search-web", "result"));
    let chain = chain_with(&model, vec![tool]);

    chain
        .call(&mut history(&store), &ChatMessage::human("question"))
        .await
        .unwrap();

    // Iteration 0 carries the input as the trailing message; afterwards
    // it lives in the working history exactly once.
    let requests = model.requests();
    assert_eq!(requests[0].last().unwrap().content, "question");
    let occurrences = requests[1]
        .iter()
        .filter(|m| m.role == Role::Human && m.content == "question")
        .count();
    assert_eq!(occurrences, 1);
}

#[tokio::test]
async fn failing_tool_becomes_an_observation() {
    let store = MemStore::new();
    let model = Arc::new(StubModel::texts(&[SEARCH, CHAT_OK]));
    let tool = Arc::new(StubTool::failing("search-web", "connection refused"));
    let chain = chain_with(&model, vec![tool.clone()]);

    let reply = chain
        .call(&mut history(&store), &ChatMessage::human("hi"))
        .await
        .unwrap();

    // The turn survived the tool failure and still reached chat.
    assert_eq!(reply.content, "ok");
    assert_eq!(tool.calls(), 1);

    let second = &model.requests()[1];
    assert!(second.iter().any(|m| m.content.contains("connection refused")));
}

#[tokio::test]
async fn unrecognized_tool_gets_a_corrective_message() {
    let store = MemStore::new();
    let model = Arc::new(StubModel::texts(&[
        r#"{"tool": "teleport", "args": {}}"#,
        CHAT_OK,
    ]));
    let chain = chain_with(&model, vec![]);

    let reply = chain
        .call(&mut history(&store), &ChatMessage::human("hi"))
        .await
        .unwrap();

    assert_eq!(reply.content, "ok");
    let second = &model.requests()[1];
    assert!(second.iter().any(|m| m.content.contains("Unknown tool 'teleport'")));
}

#[tokio::test]
async fn malformed_output_gets_a_corrective_message() {
    let store = MemStore::new();
    let model = Arc::new(StubModel::texts(&["gibberish, no json here", CHAT_OK]));
    let chain = chain_with(&model, vec![]);

    let reply = chain
        .call(&mut history(&store), &ChatMessage::human("hi"))
        .await
        .unwrap();

    assert_eq!(reply.content, "ok");
    let second = &model.requests()[1];
    assert!(second.iter().any(|m| {
        m.role == Role::System && m.content.contains("Please check your input and try again")
    }));
}

#[tokio::test]
async fn forced_final_answer_after_the_cap() {
    let store = MemStore::new();
    // Six search turns, then compliance with the forced directive.
    let model = Arc::new(StubModel::texts(&[
        SEARCH, SEARCH, SEARCH, SEARCH, SEARCH, SEARCH, CHAT_OK,
    ]));
    let tool = Arc::new(StubTool::new("search-web", "result"));
    let chain = chain_with(&model, vec![tool]);

    let reply = chain
        .call(&mut history(&store), &ChatMessage::human("hi"))
        .await
        .unwrap();

    assert_eq!(reply.content, "ok");
    assert_eq!(model.calls(), 7);

    let last = model.requests().pop().unwrap();
    assert!(last.iter().any(|m| m.content.contains("only the chat tool")));
}

#[tokio::test]
async fn non_compliance_after_the_cap_fails_the_turn() {
    let store = MemStore::new();
    let model = Arc::new(StubModel::texts(&[SEARCH]));
    let tool = Arc::new(StubTool::new("search-web", "result"));
    let chain = chain_with(&model, vec![tool.clone()]);

    let err = chain
        .call(&mut history(&store), &ChatMessage::human("hi"))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::ToolLoopExceeded { limit: 5 })
    ));
    // Five normal turns, the zeroth, and one grace invocation.
    assert_eq!(model.calls(), 7);
    assert_eq!(tool.calls(), 6);

    // The failed turn was not persisted.
    let mut log = ConversationLog::new(Arc::new(store.clone()), "c1");
    assert!(log.messages().await.unwrap().is_empty());
}
