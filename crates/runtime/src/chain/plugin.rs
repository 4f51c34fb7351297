//! Plugin chain: function calling over every registered tool.

use crate::chain::function::run_function_loop;
use anyhow::Result;
use memory::HistoryMemory;
use ncore::{ChatMessage, ChatModel, Tool};
use std::sync::Arc;

/// General tool invocation: the function-calling loop with the whole
/// tool registry attached instead of just the browsing pair.
pub struct PluginChain {
    model: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    system_prompts: Vec<ChatMessage>,
}

impl PluginChain {
    /// Build a plugin chain over the given tools.
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Vec<Arc<dyn Tool>>,
        system_prompts: Vec<ChatMessage>,
    ) -> Self {
        Self {
            model,
            tools,
            system_prompts,
        }
    }

    /// Run one turn.
    pub async fn call(
        &self,
        history: &mut HistoryMemory,
        message: &ChatMessage,
    ) -> Result<ChatMessage> {
        run_function_loop(&self.model, &self.tools, &self.system_prompts, history, message).await
    }
}
