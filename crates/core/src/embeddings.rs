//! Embeddings surface and the no-op stand-in.

use anyhow::Result;
use futures_util::future::BoxFuture;

/// Maps text to dense vectors for similarity search.
pub trait Embeddings: Send + Sync {
    /// Embed a single query string.
    fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;

    /// Embed a batch of documents.
    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Embeddings that always return empty vectors and never fail.
///
/// Stands in when long-term memory is disabled (no embedding API cost)
/// and as the terminal fallback of default-embeddings resolution.
pub struct NullEmbeddings;

impl Embeddings for NullEmbeddings {
    fn embed_query<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        let count = texts.len();
        Box::pin(async move { Ok(vec![Vec::new(); count]) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_embeddings_are_empty() {
        let emb = NullEmbeddings;
        assert!(emb.embed_query("anything").await.unwrap().is_empty());

        let docs = emb
            .embed_documents(&["a".into(), "b".into()])
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|v| v.is_empty()));
    }
}
