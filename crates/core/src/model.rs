//! Model capability surface consumed by the agent chains.

use crate::{ChatMessage, FunctionCall, ToolSpec};
use anyhow::Result;
use futures_util::future::BoxFuture;

/// Options for a single generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Tool schemas attached for structured function calling.
    pub tools: Vec<ToolSpec>,
}

/// One model completion.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    /// The reply text.
    pub text: String,

    /// A structured function-call directive, when the backend emits one.
    pub function_call: Option<FunctionCall>,
}

impl ModelResponse {
    /// Convert into an assistant message for the working history.
    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            content: self.text,
            name: String::new(),
            role: crate::Role::Ai,
            function_call: self.function_call,
        }
    }
}

/// A chat-completion model resolved from a [`ModelProvider`](crate::ModelProvider).
///
/// Async methods return boxed futures so the trait stays object-safe;
/// sessions hold models as `Arc<dyn ChatModel>`.
pub trait ChatModel: Send + Sync {
    /// Identity tag used for context-size lookup.
    fn model_type(&self) -> &str;

    /// Estimate the token count of a text.
    fn get_num_tokens(&self, text: &str) -> usize {
        text.len() / 4 + 1
    }

    /// Whether the backend understands structured function calls.
    fn supports_functions(&self) -> bool {
        false
    }

    /// Run one completion over the messages.
    fn generate<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: GenerateOptions,
    ) -> BoxFuture<'a, Result<ModelResponse>>;

    /// Drop any backend-side context attached to this model instance.
    fn clear_context(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
