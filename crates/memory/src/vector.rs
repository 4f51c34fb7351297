//! Long-term vector memory over a retriever.

use anyhow::Result;
use ncore::{Document, Retriever};
use std::sync::Arc;

/// Long-term memory: completed exchanges stored in a vector store and
/// recalled by similarity to the next input.
#[derive(Clone)]
pub struct VectorMemory {
    retriever: Arc<dyn Retriever>,
}

impl VectorMemory {
    /// Wrap a retriever as long-term memory.
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }

    /// The underlying retriever.
    pub fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    /// Documents relevant to the given input.
    pub async fn load_relevant(&self, input: &str) -> Result<Vec<Document>> {
        self.retriever.retrieve(input).await
    }

    /// Store one completed exchange for later recall.
    pub async fn save_exchange(&self, input: &str, output: &str) -> Result<()> {
        self.retriever
            .add_texts(&[format!("user: {input}\nyour: {output}")])
            .await
    }
}
