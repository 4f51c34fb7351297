//! The per-conversation session orchestrator.

use crate::chain::{BrowsingChain, Chain, ChatChain, FunctionChain, PluginChain};
use anyhow::Result;
use memory::{ConversationLog, HistoryMemory, VectorMemory};
use ncore::{
    ChatMessage, ChatMode, ChatModel, CreateParams, Embeddings, InMemoryRetriever, NullEmbeddings,
    Retriever, Tool, ToolContext,
};
use registry::Registry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How prior turns are fed into the next model invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// Verbatim full transcript.
    All,
    /// Running summary maintained by the model.
    Summary,
}

/// Everything a session needs to come up.
pub struct ChatInterfaceInput {
    /// The requested interaction mode.
    pub chat_mode: ChatMode,
    /// How history feeds the model.
    pub history_mode: HistoryMode,
    /// Name the bot answers as.
    pub bot_name: String,
    /// The conversation's persisted log.
    pub log: ConversationLog,
    /// System prompts, usually from a preset.
    pub system_prompts: Vec<ChatMessage>,
    /// Whether long-term vector memory is enabled.
    pub long_memory: bool,
    /// Provider construction parameters (API keys and the like).
    pub create_params: CreateParams,
    /// `"provider/model"` to resolve.
    pub mixed_model_name: String,
    /// Explicit `"provider/name"` embeddings, or `None` for the default
    /// resolution chain.
    pub mixed_embeddings_name: Option<String>,
    /// Explicit `"provider/name"` vector store, or `None` for the
    /// default resolution chain.
    pub mixed_vector_store_name: Option<String>,
}

/// One conversation session: a resolved model, its history memory, a
/// long-term vector memory, and the mode-specific chain.
///
/// Recreated whenever the conversation's preset or model binding
/// changes. Callers must serialize `chat` calls per conversation id;
/// two concurrent turns on one conversation would race on the shared
/// history state.
pub struct ChatInterface {
    chat_mode: ChatMode,
    model: Arc<dyn ChatModel>,
    embeddings: Arc<dyn Embeddings>,
    long_memory: VectorMemory,
    history: HistoryMemory,
    chain: Chain,
}

impl ChatInterface {
    /// Initialize a session.
    ///
    /// Resolution order: embeddings, vector retriever, model, capability
    /// check, history memory, chain. The first failure fails the whole
    /// initialization; a failed construction leaves no partial state
    /// behind. An unsupported chat mode is not a failure: the session
    /// downgrades to plain chat and carries on.
    pub async fn init(registry: Registry, mut input: ChatInterfaceInput) -> Result<Self> {
        tracing::debug!(
            "chat mode: {}, long memory: {}",
            input.chat_mode,
            input.long_memory
        );

        // 1. Embeddings: skip the API entirely when nothing will use them.
        let mut embeddings: Arc<dyn Embeddings> =
            if !input.long_memory && input.chat_mode == ChatMode::Chat {
                Arc::new(NullEmbeddings)
            } else if let Some(mixed) = &input.mixed_embeddings_name {
                registry.create_embeddings(mixed, &input.create_params).await?
            } else {
                registry.default_embeddings(&input.create_params).await
            };

        // 2. Vector retriever: the in-memory store unless long-term
        // memory is on and the mode is plain chat.
        let mut retriever: Arc<dyn Retriever> =
            if !input.long_memory || input.chat_mode != ChatMode::Chat {
                Arc::new(InMemoryRetriever::new(embeddings.clone()))
            } else {
                let mut params = input.create_params.clone();
                params.embeddings = Some(embeddings.clone());
                match &input.mixed_vector_store_name {
                    Some(mixed) => {
                        registry.create_vector_store_retriever(mixed, params).await?
                    }
                    None => registry.default_vector_store_retriever(params).await,
                }
            };

        // 3. Model.
        let mut params = input.create_params.clone();
        params.embeddings = Some(embeddings.clone());
        let (provider, model) = registry
            .create_model_and_provider(&input.mixed_model_name, &params)
            .await?;

        // 4. Capability check: graceful degradation, not a failure.
        if !provider
            .supports_chat_mode(model.model_type(), input.chat_mode)
            .await
        {
            tracing::warn!(
                "chat mode {} is not supported by model {}, falling back to plain chat",
                input.chat_mode,
                input.mixed_model_name
            );
            input.chat_mode = ChatMode::Chat;
            embeddings = Arc::new(NullEmbeddings);
            retriever = Arc::new(InMemoryRetriever::new(embeddings.clone()));
        }

        let long_memory = VectorMemory::new(retriever);

        // 5. History memory.
        let history = match input.history_mode {
            HistoryMode::All => HistoryMemory::buffer(input.log),
            HistoryMode::Summary => HistoryMemory::summary(input.log, model.clone()).await?,
        };

        // 6. The mode-specific chain.
        let chain = build_chain(
            &registry,
            input.chat_mode,
            model.clone(),
            embeddings.clone(),
            long_memory.clone(),
            input.system_prompts,
        )
        .await?;

        Ok(Self {
            chat_mode: input.chat_mode,
            model,
            embeddings,
            long_memory,
            history,
            chain,
        })
    }

    /// Run one full conversation turn. One call = one turn, which may
    /// contain an internal multi-step tool loop.
    pub async fn chat(&mut self, message: impl Into<String>) -> Result<ChatMessage> {
        let message = ChatMessage::human(message);
        self.chain.call(&mut self.history, &message).await
    }

    /// Clear the persisted history, the model's own context, and the
    /// running summary. Three independent resets; all are required for
    /// the next turn to start clean.
    pub async fn clear_history(&mut self) -> Result<()> {
        self.history.log_mut().clear().await?;
        self.model.clear_context().await?;
        self.history.reset();
        Ok(())
    }

    /// The effective chat mode after any capability downgrade.
    pub fn chat_mode(&self) -> ChatMode {
        self.chat_mode
    }

    /// The resolved model.
    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    /// The resolved embeddings.
    pub fn embeddings(&self) -> &Arc<dyn Embeddings> {
        &self.embeddings
    }

    /// The session's long-term vector memory.
    pub fn long_memory(&self) -> &VectorMemory {
        &self.long_memory
    }

    /// The session's history memory.
    pub fn history_mut(&mut self) -> &mut HistoryMemory {
        &mut self.history
    }
}

/// Build the chain for the effective mode.
///
/// Browsing resolves the search/web-browser tool providers; the
/// structured function-calling variant is preferred when the model
/// supports it, with the text protocol as the portable fallback.
async fn build_chain(
    registry: &Registry,
    mode: ChatMode,
    model: Arc<dyn ChatModel>,
    embeddings: Arc<dyn Embeddings>,
    long_memory: VectorMemory,
    system_prompts: Vec<ChatMessage>,
) -> Result<Chain> {
    match mode {
        ChatMode::Chat => Ok(Chain::Chat(ChatChain::new(
            model,
            system_prompts,
            long_memory,
        ))),
        ChatMode::Browsing => {
            let providers = registry.select_tool_providers(|name, _| {
                Ok(name.contains("search") || name.contains("web-browser"))
            });
            let tools = create_tools(providers, &model, &embeddings).await?;

            if model.supports_functions() {
                Ok(Chain::FunctionCalling(FunctionChain::new(
                    model,
                    tools,
                    system_prompts,
                )))
            } else {
                Ok(Chain::Browsing(BrowsingChain::new(
                    model,
                    tools,
                    system_prompts,
                )))
            }
        }
        ChatMode::Plugin => {
            let providers = registry.select_tool_providers(|_, _| Ok(true));
            let tools = create_tools(providers, &model, &embeddings).await?;
            Ok(Chain::Plugin(PluginChain::new(model, tools, system_prompts)))
        }
    }
}

async fn create_tools(
    providers: Vec<Arc<dyn ncore::ToolProvider>>,
    model: &Arc<dyn ChatModel>,
    embeddings: &Arc<dyn Embeddings>,
) -> Result<Vec<Arc<dyn Tool>>> {
    let ctx = ToolContext {
        model: model.clone(),
        embeddings: embeddings.clone(),
    };
    let mut tools = Vec::with_capacity(providers.len());
    for provider in providers {
        tools.push(provider.create_tool(&ctx).await?);
    }
    Ok(tools)
}
