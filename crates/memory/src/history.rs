//! History memory: verbatim transcript or running summary.

use crate::ConversationLog;
use anyhow::Result;
use ncore::{ChatMessage, ChatModel, GenerateOptions};
use std::sync::Arc;

/// Prompt used to fold new conversation lines into the running summary.
const SUMMARY_PROMPT: &str = "Progressively summarize the lines of conversation provided, \
adding onto the previous summary and returning a new summary.";

/// The subsystem feeding prior turns into the next model invocation.
///
/// [`Buffer`](HistoryMemory::Buffer) replays the full persisted
/// transcript verbatim; [`Summary`](HistoryMemory::Summary) maintains a
/// running summary updated by the model after every exchange.
pub enum HistoryMemory {
    /// Keep-everything transcript.
    Buffer(BufferMemory),
    /// Running-summary memory.
    Summary(SummaryMemory),
}

/// Full-transcript history memory.
pub struct BufferMemory {
    log: ConversationLog,
}

/// Running-summary history memory.
pub struct SummaryMemory {
    log: ConversationLog,
    model: Arc<dyn ChatModel>,
    buffer: String,
}

impl HistoryMemory {
    /// Build a full-transcript memory over the log.
    pub fn buffer(log: ConversationLog) -> Self {
        HistoryMemory::Buffer(BufferMemory { log })
    }

    /// Build a summary memory over the log.
    ///
    /// Seeds itself by summarizing the last two persisted messages so a
    /// resumed conversation has a non-empty summary immediately.
    pub async fn summary(log: ConversationLog, model: Arc<dyn ChatModel>) -> Result<Self> {
        let mut memory = SummaryMemory {
            log,
            model,
            buffer: String::new(),
        };
        memory.seed().await?;
        Ok(HistoryMemory::Summary(memory))
    }

    /// The underlying conversation log.
    pub fn log(&self) -> &ConversationLog {
        match self {
            HistoryMemory::Buffer(memory) => &memory.log,
            HistoryMemory::Summary(memory) => &memory.log,
        }
    }

    /// Mutable access to the underlying conversation log.
    pub fn log_mut(&mut self) -> &mut ConversationLog {
        match self {
            HistoryMemory::Buffer(memory) => &mut memory.log,
            HistoryMemory::Summary(memory) => &mut memory.log,
        }
    }

    /// Messages to prepend to the next model invocation.
    pub async fn load(&mut self) -> Result<Vec<ChatMessage>> {
        match self {
            HistoryMemory::Buffer(memory) => memory.log.messages().await,
            HistoryMemory::Summary(memory) => {
                if memory.buffer.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![ChatMessage::system(format!(
                    "This is the conversation between me and you so far: {}",
                    memory.buffer
                ))])
            }
        }
    }

    /// Persist one completed exchange and update derived state.
    pub async fn save_context(&mut self, input: &str, output: &str) -> Result<()> {
        match self {
            HistoryMemory::Buffer(memory) => {
                memory.log.add_user_message(input).await?;
                memory.log.add_ai_message(output).await
            }
            HistoryMemory::Summary(memory) => {
                memory.log.add_user_message(input).await?;
                memory.log.add_ai_message(output).await?;

                let lines = [ChatMessage::human(input), ChatMessage::ai(output)];
                memory.buffer =
                    predict_new_summary(&*memory.model, &lines, &memory.buffer).await?;
                Ok(())
            }
        }
    }

    /// Reset the derived summary. The persisted log is untouched.
    pub fn reset(&mut self) {
        if let HistoryMemory::Summary(memory) = self {
            memory.buffer.clear();
        }
    }

    /// The current running summary, when one exists.
    pub fn summary_buffer(&self) -> Option<&str> {
        match self {
            HistoryMemory::Buffer(_) => None,
            HistoryMemory::Summary(memory) => Some(&memory.buffer),
        }
    }
}

impl SummaryMemory {
    async fn seed(&mut self) -> Result<()> {
        let history = self.log.messages().await?;
        let skip = history.len().saturating_sub(2);
        let tail = &history[skip..];
        if tail.is_empty() {
            return Ok(());
        }

        self.buffer = predict_new_summary(&*self.model, tail, "").await?;
        Ok(())
    }
}

/// Ask the model for an updated running summary.
async fn predict_new_summary(
    model: &dyn ChatModel,
    new_lines: &[ChatMessage],
    current: &str,
) -> Result<String> {
    let mut rendered = String::new();
    for line in new_lines {
        rendered.push_str(&format!("{}: {}\n", line.role, line.content));
    }

    let request = [
        ChatMessage::system(SUMMARY_PROMPT),
        ChatMessage::human(format!(
            "Current summary:\n{current}\n\nNew lines of conversation:\n{rendered}\nNew summary:"
        )),
    ];

    let response = model.generate(&request, GenerateOptions::default()).await?;
    Ok(response.text)
}
