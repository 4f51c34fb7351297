//! Provider abstractions resolved by the registry.
//!
//! Providers are named capability factories registered once at startup
//! and stateless with respect to individual conversations. All async
//! methods return boxed futures so the traits stay object-safe behind
//! `Arc<dyn _>`.

use crate::{ChatModel, Embeddings, Retriever, Tool};
use anyhow::Result;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

/// The interaction mode of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Plain chat, no tools.
    Chat,
    /// Tool-augmented browsing (search and web fetch).
    Browsing,
    /// General tool invocation over every registered tool.
    Plugin,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChatMode::Chat => "chat",
            ChatMode::Browsing => "browsing",
            ChatMode::Plugin => "plugin",
        })
    }
}

/// Parameters threaded through provider construction.
///
/// Carries the opaque key-value bag (API keys, cookies, model knobs)
/// plus the live handles downstream factories need.
#[derive(Clone, Default)]
pub struct CreateParams {
    /// Embeddings instance for vector store construction.
    pub embeddings: Option<Arc<dyn Embeddings>>,

    /// Preferred embeddings name for default resolution.
    pub embeddings_name: Option<String>,

    /// Opaque provider-specific values.
    pub extra: Map<String, Value>,
}

impl CreateParams {
    /// Look up a string value from the opaque bag.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// A named factory for chat models.
pub trait ModelProvider: Send + Sync {
    /// The registered provider name.
    fn name(&self) -> &str;

    /// Whether this provider can instantiate the named model.
    fn supports<'a>(&'a self, model: &'a str) -> BoxFuture<'a, bool>;

    /// Instantiate the named model.
    fn create_model<'a>(
        &'a self,
        model: &'a str,
        params: &'a CreateParams,
    ) -> BoxFuture<'a, Result<Arc<dyn ChatModel>>>;

    /// Whether the given model type can drive the given chat mode.
    fn supports_chat_mode<'a>(
        &'a self,
        model_type: &'a str,
        mode: ChatMode,
    ) -> BoxFuture<'a, bool>;

    /// Release provider resources on deregistration.
    fn dispose(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// A named factory for embeddings.
pub trait EmbeddingsProvider: Send + Sync {
    /// The registered provider name.
    fn name(&self) -> &str;

    /// Whether this provider can instantiate the named embeddings.
    fn supports<'a>(&'a self, name: &'a str) -> BoxFuture<'a, bool>;

    /// Names of the embeddings this provider offers, preferred first.
    fn list_embeddings(&self) -> BoxFuture<'_, Vec<String>>;

    /// Instantiate the named embeddings.
    fn create_embeddings<'a>(
        &'a self,
        name: &'a str,
        params: &'a CreateParams,
    ) -> BoxFuture<'a, Result<Arc<dyn Embeddings>>>;

    /// Release provider resources on deregistration.
    fn dispose(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// A named factory for vector store retrievers.
pub trait VectorStoreRetrieverProvider: Send + Sync {
    /// The registered provider name.
    fn name(&self) -> &str;

    /// Instantiate a retriever; `params.embeddings` is always populated
    /// by the time the registry calls this.
    fn create_retriever<'a>(
        &'a self,
        params: &'a CreateParams,
    ) -> BoxFuture<'a, Result<Arc<dyn Retriever>>>;

    /// Release provider resources on deregistration.
    fn dispose(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// Context handed to tool construction.
///
/// Tools that need to summarize or embed (a web browser condensing a
/// page, say) reuse the session's model and embeddings.
#[derive(Clone)]
pub struct ToolContext {
    /// The session's resolved model.
    pub model: Arc<dyn ChatModel>,
    /// The session's resolved embeddings.
    pub embeddings: Arc<dyn Embeddings>,
}

/// A named factory for tools.
pub trait ToolProvider: Send + Sync {
    /// The registered tool name.
    fn name(&self) -> &str;

    /// Instantiate the tool for a session.
    fn create_tool<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, Result<Arc<dyn Tool>>>;
}
