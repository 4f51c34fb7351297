//! Vector store retriever surface and the in-memory fallback.

use crate::Embeddings;
use anyhow::Result;
use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex};

/// A document returned by similarity search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// The stored text.
    pub content: String,
}

/// Similarity search over stored texts.
pub trait Retriever: Send + Sync {
    /// Store texts for later retrieval.
    fn add_texts<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<()>>;

    /// Return the stored documents most similar to the query.
    fn retrieve<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Document>>>;
}

/// In-memory vector store retriever.
///
/// Terminal fallback when no vector store provider resolves: cosine
/// similarity over everything it has seen, top-k. With [`NullEmbeddings`]
/// every query embeds to the empty vector and retrieval returns nothing,
/// which is exactly the disabled-long-memory behavior.
///
/// [`NullEmbeddings`]: crate::NullEmbeddings
pub struct InMemoryRetriever {
    embeddings: Arc<dyn Embeddings>,
    entries: Mutex<Vec<(String, Vec<f32>)>>,
    top_k: usize,
}

impl InMemoryRetriever {
    /// Create an empty retriever over the given embeddings.
    pub fn new(embeddings: Arc<dyn Embeddings>) -> Self {
        Self {
            embeddings,
            entries: Mutex::new(Vec::new()),
            top_k: 6,
        }
    }

    /// Override how many documents [`retrieve`](Retriever::retrieve) returns.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

impl Retriever for InMemoryRetriever {
    fn add_texts<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let vectors = self.embeddings.embed_documents(texts).await?;
            let mut entries = self.entries.lock().unwrap();
            for (text, vector) in texts.iter().zip(vectors) {
                entries.push((text.clone(), vector));
            }
            Ok(())
        })
    }

    fn retrieve<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Document>>> {
        Box::pin(async move {
            let query_vec = self.embeddings.embed_query(query).await?;
            if query_vec.is_empty() {
                return Ok(Vec::new());
            }

            let entries = self.entries.lock().unwrap();
            let mut scored: Vec<(f32, &String)> = entries
                .iter()
                .map(|(text, vector)| (cosine(&query_vec, vector), text))
                .filter(|(score, _)| score.is_finite())
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));

            Ok(scored
                .into_iter()
                .take(self.top_k)
                .map(|(_, text)| Document {
                    content: text.clone(),
                })
                .collect())
        })
    }
}

/// Cosine similarity; zero for mismatched or empty vectors.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
