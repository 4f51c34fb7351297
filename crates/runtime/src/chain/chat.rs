//! Single-shot chat chain.

use crate::chain::{DEFAULT_SYSTEM_PROMPT, fit_to_budget};
use anyhow::Result;
use memory::{HistoryMemory, VectorMemory};
use ncore::{ChatMessage, ChatModel, GenerateOptions};
use std::sync::Arc;

/// Plain chat: system prompts, long-term recall, history, input, one
/// model call.
pub struct ChatChain {
    model: Arc<dyn ChatModel>,
    system_prompts: Vec<ChatMessage>,
    long_memory: VectorMemory,
}

impl ChatChain {
    /// Build a chat chain.
    pub fn new(
        model: Arc<dyn ChatModel>,
        system_prompts: Vec<ChatMessage>,
        long_memory: VectorMemory,
    ) -> Self {
        Self {
            model,
            system_prompts,
            long_memory,
        }
    }

    /// Run one turn.
    pub async fn call(
        &self,
        history: &mut HistoryMemory,
        message: &ChatMessage,
    ) -> Result<ChatMessage> {
        let mut request = self.system_prompts.clone();
        if request.is_empty() {
            request.push(ChatMessage::system(DEFAULT_SYSTEM_PROMPT));
        }

        let relevant = self.long_memory.load_relevant(&message.content).await?;
        if !relevant.is_empty() {
            let rendered: Vec<&str> = relevant.iter().map(|doc| doc.content.as_str()).collect();
            request.push(ChatMessage::system(format!(
                "Here are some previous exchanges you may find relevant:\n{}",
                rendered.join("\n")
            )));
        }

        request.extend(history.load().await?);
        request.push(message.clone());
        fit_to_budget(&*self.model, &mut request);

        let response = self
            .model
            .generate(&request, GenerateOptions::default())
            .await?;
        let answer = response.text;

        history.save_context(&message.content, &answer).await?;
        self.long_memory
            .save_exchange(&message.content, &answer)
            .await?;

        Ok(ChatMessage::ai(answer))
    }
}
