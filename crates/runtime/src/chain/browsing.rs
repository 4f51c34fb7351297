//! Text-protocol browsing chain.
//!
//! The portable tool loop: the model is prompted to answer every turn
//! with a JSON action, which works against any backend that can follow
//! formatting instructions. Backends with structured function-call
//! support use [`FunctionChain`](crate::FunctionChain) instead.

use crate::chain::{DEFAULT_SYSTEM_PROMPT, fit_to_budget};
use crate::parser::parse_action;
use anyhow::Result;
use memory::HistoryMemory;
use ncore::{Action, ChatMessage, ChatModel, Error, GenerateOptions, Tool};
use std::sync::Arc;

/// Tool turns allowed before the loop forces a final answer.
const MAX_TOOL_TURNS: usize = 5;

/// Action format instructions appended to the system prompt.
const TOOLS_PROMPT: &str = r#"You can use the following tools, at most one per turn:

1. search: searches the web for current information. Args: {"keyword": "the search keyword"}
2. browse: opens a web page and reads its content. Args: {"url": "the url to open", "task": "what to look for"}
3. chat: replies to the user and finishes the turn. Args: {"response": "your reply"}

You must respond in JSON format as described below.

RESPONSE FORMAT:
{"tool": "the tool name", "args": {...}}

Make sure the response can be parsed by a standard JSON parser. Do not write anything outside the JSON object."#;

/// Directive injected once the loop has run too long.
const FORCE_CHAT_PROMPT: &str = "You have called tools too many times. You must now answer the \
user's question yourself and only the chat tool may be used. Remember to respond in the JSON \
format described above.";

/// The text-protocol tool loop.
pub struct BrowsingChain {
    model: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    system_prompt: ChatMessage,
}

impl BrowsingChain {
    /// Build a browsing chain over the given tools.
    ///
    /// Only the first system prompt is used; extras are ignored with a
    /// warning.
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Vec<Arc<dyn Tool>>,
        system_prompts: Vec<ChatMessage>,
    ) -> Self {
        if system_prompts.len() > 1 {
            tracing::warn!(
                "browsing chain supports a single system prompt; ignoring {} extra",
                system_prompts.len() - 1
            );
        }
        let system_prompt = system_prompts
            .into_iter()
            .next()
            .unwrap_or_else(|| ChatMessage::system(DEFAULT_SYSTEM_PROMPT));
        Self {
            model,
            tools,
            system_prompt,
        }
    }

    /// Run one turn: loop on decide → execute → observe until the model
    /// answers with the chat tool.
    pub async fn call(
        &self,
        history: &mut HistoryMemory,
        message: &ChatMessage,
    ) -> Result<ChatMessage> {
        let mut working = vec![self.system_prompt.clone(), ChatMessage::system(TOOLS_PROMPT)];
        working.extend(history.load().await?);

        // The input rides along only until iteration 0 folds it into the
        // working history.
        let mut input = Some(message.clone());
        let mut turn = 0usize;
        let final_response;

        loop {
            if turn > MAX_TOOL_TURNS {
                working.push(ChatMessage::system(FORCE_CHAT_PROMPT));
                let reply = self.invoke(&working, input.as_ref()).await?;
                tracing::debug!("assistant reply (forced): {reply}");

                match parse_action(&reply) {
                    Action::Chat { response } => {
                        final_response = response;
                        break;
                    }
                    _ => {
                        return Err(Error::ToolLoopExceeded {
                            limit: MAX_TOOL_TURNS,
                        })?;
                    }
                }
            }

            let reply = self.invoke(&working, input.as_ref()).await?;
            tracing::debug!("assistant reply: {reply}");

            let observation = match parse_action(&reply) {
                Action::Chat { response } => {
                    final_response = response;
                    break;
                }
                Action::Tool { name, args } if name == "search" || name == "browse" => {
                    match self.select_tool(&name) {
                        Some(tool) => {
                            let observed = match tool.call(args).await {
                                Ok(result) => result,
                                Err(err) => {
                                    tracing::error!("tool `{}` failed: {err}", tool.name());
                                    format!("Error in args: {err}")
                                }
                            };
                            format!("Tool {} returned: {observed}", tool.name())
                        }
                        None => format!("Unknown tool '{name}'."),
                    }
                }
                Action::Tool { name, .. } => format!("Unknown tool '{name}'."),
                Action::Error { detail } => format!(
                    "Error: {detail}. Please check your input and try again. If you want to \
                     chat with user, please use the chat tool."
                ),
            };

            if turn == 0 {
                working.push(message.clone());
                input = None;
            }
            working.push(ChatMessage::ai(reply));
            working.push(ChatMessage::system(observation));
            turn += 1;
        }

        history.save_context(&message.content, &final_response).await?;
        Ok(ChatMessage::ai(final_response))
    }

    async fn invoke(
        &self,
        working: &[ChatMessage],
        input: Option<&ChatMessage>,
    ) -> Result<String> {
        let mut request = working.to_vec();
        if let Some(input) = input {
            request.push(input.clone());
        }
        fit_to_budget(&*self.model, &mut request);

        let response = self
            .model
            .generate(&request, GenerateOptions::default())
            .await?;
        Ok(response.text)
    }

    /// Documented lookup rule, kept for compatibility: `search` matches
    /// the first tool whose name contains "search", `browse` matches the
    /// tool named exactly "web-browser". Not a general pattern.
    fn select_tool(&self, action: &str) -> Option<&Arc<dyn Tool>> {
        match action {
            "search" => self
                .tools
                .iter()
                .find(|tool| tool.name().to_lowercase().contains("search")),
            "browse" => self.tools.iter().find(|tool| tool.name() == "web-browser"),
            _ => None,
        }
    }
}
