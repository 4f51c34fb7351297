//! Structured function-calling browsing chain.

use crate::chain::{DEFAULT_SYSTEM_PROMPT, fit_to_budget};
use anyhow::Result;
use memory::HistoryMemory;
use ncore::{
    ChatMessage, ChatModel, Error, FunctionCall, GenerateOptions, Tool, ToolSpec,
};
use serde_json::Value;
use std::sync::Arc;

/// Tool iterations allowed before the loop fails.
pub(crate) const MAX_FUNCTION_TURNS: usize = 10;

/// The function-calling tool loop over the browsing tools.
///
/// Functionally the same state machine as
/// [`BrowsingChain`](crate::BrowsingChain), but the action arrives as a
/// structured function-call directive instead of parsed free text.
pub struct FunctionChain {
    model: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    system_prompts: Vec<ChatMessage>,
}

impl FunctionChain {
    /// Build a function-calling chain over the given tools.
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

/// The shared function-calling loop.
///
/// Per iteration: invoke the model with the tool schemas attached; a
/// function-call directive selects a tool by exact name and loops with
/// its output as a function message; a plain reply is the final answer.
pub(crate) async fn run_function_loop(
    model: &Arc<dyn ChatModel>,
    tools: &[Arc<dyn Tool>],
    system_prompts: &[ChatMessage],
    history: &mut HistoryMemory,
    message: &ChatMessage,
) -> Result<ChatMessage> {
    let mut working = system_prompts.to_vec();
    if working.is_empty() {
        working.push(ChatMessage::system(DEFAULT_SYSTEM_PROMPT));
    }
    working.extend(history.load().await?);

    let specs: Vec<ToolSpec> = tools.iter().map(|tool| tool.spec()).collect();
    let mut input = Some(message.clone());
    let mut turns = 0usize;
    let final_response;

    loop {
        let mut request = working.clone();
        if let Some(input) = &input {
            request.push(input.clone());
        }
        fit_to_budget(&**model, &mut request);

        let response = model
            .generate(
                &request,
                GenerateOptions {
                    tools: specs.clone(),
                },
            )
            .await?;
        tracing::debug!("assistant reply: {:?}", response);

        if turns == 0 {
            working.push(message.clone());
            input = None;
        }

        let Some(call) = response.function_call.clone() else {
            final_response = response.text;
            break;
        };

        if turns >= MAX_FUNCTION_TURNS {
            return Err(Error::ToolLoopExceeded {
                limit: MAX_FUNCTION_TURNS,
            })?;
        }

        working.push(response.into_message());
        let (name, content) = dispatch(tools, &call).await;
        working.push(ChatMessage::function(content, name));
        turns += 1;
    }

    history.save_context(&message.content, &final_response).await?;
    Ok(ChatMessage::ai(final_response))
}

/// Execute one function-call directive.
///
/// Every failure (unknown tool, unparsable arguments, the tool itself
/// erroring) is converted into an error-content response fed back to
/// the model rather than aborting the turn.
async fn dispatch(tools: &[Arc<dyn Tool>], call: &FunctionCall) -> (String, String) {
    let Some(tool) = tools.iter().find(|tool| tool.name() == call.name) else {
        return (
            call.name.clone(),
            format!("Call tool `{}` failed: no such tool", call.name),
        );
    };

    let args: Value = if call.arguments.is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(err) => {
                return (
                    tool.name().to_owned(),
                    format!("Call tool `{}` failed: invalid arguments: {err}", call.name),
                );
            }
        }
    };

    match tool.call(args).await {
        Ok(result) => (tool.name().to_owned(), result),
        Err(err) => {
            tracing::error!("tool `{}` failed: {err}", call.name);
            (
                tool.name().to_owned(),
                format!("Call tool `{}` failed: {err}", call.name),
            )
        }
    }
}
