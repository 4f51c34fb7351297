//! Scripted stubs for exercising chains and registries without real
//! backends.
//!
//! Everything here is deterministic: models replay a fixed script,
//! embeddings hash bytes into small vectors, tools return canned
//! observations. Gated behind the `testing` feature.

use crate::{
    ChatMessage, ChatMode, ChatModel, CreateParams, Embeddings, EmbeddingsProvider,
    GenerateOptions, InMemoryRetriever, ModelProvider, ModelResponse, Retriever, Tool,
    ToolContext, ToolProvider, VectorStoreRetrieverProvider,
};
use anyhow::Result;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// A model that replays a fixed script of responses.
///
/// The last entry repeats once the script is exhausted. Every request's
/// message list is recorded for assertions.
pub struct StubModel {
    script: Vec<ModelResponse>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    functions: bool,
}

impl StubModel {
    /// Create a stub replaying the given responses in order.
    pub fn new(script: Vec<ModelResponse>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            functions: false,
        }
    }

    /// Create a stub replaying plain text replies.
    pub fn texts(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|text| ModelResponse {
                    text: (*text).to_owned(),
                    function_call: None,
                })
                .collect(),
        )
    }

    /// Report structured function-call support.
    pub fn with_functions(mut self) -> Self {
        self.functions = true;
        self
    }

    /// Number of generate calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The message lists received by each generate call.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

impl ChatModel for StubModel {
    fn model_type(&self) -> &str {
        "stub"
    }

    fn supports_functions(&self) -> bool {
        self.functions
    }

    fn generate<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        _options: GenerateOptions,
    ) -> BoxFuture<'a, Result<ModelResponse>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(messages.to_vec());
            let turn = self.calls.fetch_add(1, Ordering::SeqCst);
            let index = turn.min(self.script.len().saturating_sub(1));
            Ok(self.script.get(index).cloned().unwrap_or_default())
        })
    }
}

/// Deterministic embeddings: bytes folded into a fixed-size vector.
pub struct StubEmbeddings {
    dim: usize,
}

impl StubEmbeddings {
    /// Create embeddings of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dim] += byte as f32;
        }
        vector
    }
}

impl Embeddings for StubEmbeddings {
    fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(async move { Ok(self.embed(text)) })
    }

    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(async move { Ok(texts.iter().map(|text| self.embed(text)).collect()) })
    }
}

/// A tool returning a canned observation, optionally failing instead.
pub struct StubTool {
    name: String,
    response: String,
    fail: bool,
    calls: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

impl StubTool {
    /// A tool that answers every call with `response`.
    pub fn new(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: response.into(),
            fail: false,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// A tool that fails every call with `error` as the message.
    pub fn failing(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(name, error)
        }
    }

    /// Number of invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The argument payloads received, in order.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

impl Tool for StubTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(&'a self, args: Value) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.received.lock().unwrap().push(args);
            if self.fail {
                anyhow::bail!("{}", self.response);
            }
            Ok(self.response.clone())
        })
    }
}

/// A model provider serving one shared stub model for any model name.
pub struct StubModelProvider {
    name: String,
    model: Arc<StubModel>,
    unsupported_modes: Vec<ChatMode>,
}

impl StubModelProvider {
    /// Create a provider handing out `model` for every supported name.
    pub fn new(name: impl Into<String>, model: Arc<StubModel>) -> Self {
        Self {
            name: name.into(),
            model,
            unsupported_modes: Vec::new(),
        }
    }

    /// Report the given mode as unsupported for every model type.
    pub fn without_mode(mut self, mode: ChatMode) -> Self {
        self.unsupported_modes.push(mode);
        self
    }
}

impl ModelProvider for StubModelProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports<'a>(&'a self, model: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { !model.is_empty() })
    }

    fn create_model<'a>(
        &'a self,
        _model: &'a str,
        _params: &'a CreateParams,
    ) -> BoxFuture<'a, Result<Arc<dyn ChatModel>>> {
        Box::pin(async move { Ok(self.model.clone() as Arc<dyn ChatModel>) })
    }

    fn supports_chat_mode<'a>(
        &'a self,
        _model_type: &'a str,
        mode: ChatMode,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move { !self.unsupported_modes.contains(&mode) })
    }
}

/// An embeddings provider with a marker dimension, optionally failing
/// every instantiation.
pub struct StubEmbeddingsProvider {
    name: String,
    dim: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl StubEmbeddingsProvider {
    /// Create a provider producing embeddings of dimension `dim`.
    pub fn new(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every `create_embeddings` call.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(name, 0)
        }
    }

    /// Number of `create_embeddings` attempts so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingsProvider for StubEmbeddingsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports<'a>(&'a self, name: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { !name.is_empty() })
    }

    fn list_embeddings(&self) -> BoxFuture<'_, Vec<String>> {
        Box::pin(async move { vec!["default".to_owned()] })
    }

    fn create_embeddings<'a>(
        &'a self,
        _name: &'a str,
        _params: &'a CreateParams,
    ) -> BoxFuture<'a, Result<Arc<dyn Embeddings>>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("embeddings provider `{}` is offline", self.name);
            }
            Ok(Arc::new(StubEmbeddings::new(self.dim)) as Arc<dyn Embeddings>)
        })
    }
}

/// A vector store provider backed by [`InMemoryRetriever`], optionally
/// failing every instantiation.
pub struct StubVectorStoreProvider {
    name: String,
    fail: bool,
    calls: AtomicUsize,
}

impl StubVectorStoreProvider {
    /// Create a working provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every `create_retriever` call.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    /// Number of `create_retriever` attempts so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VectorStoreRetrieverProvider for StubVectorStoreProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_retriever<'a>(
        &'a self,
        params: &'a CreateParams,
    ) -> BoxFuture<'a, Result<Arc<dyn Retriever>>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("vector store `{}` is offline", self.name);
            }
            let embeddings = params
                .embeddings
                .clone()
                .unwrap_or_else(|| Arc::new(StubEmbeddings::new(8)));
            Ok(Arc::new(InMemoryRetriever::new(embeddings)) as Arc<dyn Retriever>)
        })
    }
}

/// A tool provider handing out one shared stub tool.
pub struct StubToolProvider {
    name: String,
    tool: Arc<StubTool>,
}

impl StubToolProvider {
    /// Create a provider handing out `tool`.
    pub fn new(name: impl Into<String>, tool: Arc<StubTool>) -> Self {
        Self {
            name: name.into(),
            tool,
        }
    }
}

impl ToolProvider for StubToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_tool<'a>(&'a self, _ctx: &'a ToolContext) -> BoxFuture<'a, Result<Arc<dyn Tool>>> {
        Box::pin(async move { Ok(self.tool.clone() as Arc<dyn Tool>) })
    }
}
