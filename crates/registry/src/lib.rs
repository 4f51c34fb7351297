//! Provider registry with ranked fallback resolution.
//!
//! The [`Registry`] maps provider names to model, embeddings, vector
//! store, and tool factories and resolves `"provider/model"` identifiers
//! to concrete instances. It is an explicit object with an injectable
//! lifetime: construct one at process start and hand out clones (clones
//! share state).
//!
//! Resolution is resilient by design. A misconfigured or offline
//! provider must not prevent the system from finding *some* usable
//! provider, so the default-resolution paths walk a ranked preference
//! list ("prefer local/cheap before remote/expensive") and end in
//! fallbacks that cannot fail: [`NullEmbeddings`] and
//! [`InMemoryRetriever`].

use anyhow::Result;
use ncore::{
    ChatModel, CreateParams, Embeddings, EmbeddingsProvider, Error, InMemoryRetriever,
    ModelProvider, NullEmbeddings, Retriever, ToolProvider, VectorStoreRetrieverProvider,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Default embeddings preference, walked local-to-remote.
const EMBEDDINGS_PREFERENCE: &[&str] = &["openai", "huggingface"];

/// Default vector store preference, walked local-to-remote.
const VECTOR_STORE_PREFERENCE: &[&str] = &["chroma", "milvus", "pinecone", "faiss"];

/// Process-lifetime provider registry.
///
/// Cheap to clone; clones share the underlying tables. Registration and
/// deregistration are safe while conversations are active: resolution
/// clones the provider handle out of the lock, so a deregistered
/// provider finishes whatever it is doing.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
    embeddings_preference: Arc<Vec<String>>,
    vector_store_preference: Arc<Vec<String>>,
}

#[derive(Default)]
struct Inner {
    models: Vec<(String, Arc<dyn ModelProvider>)>,
    embeddings: Vec<(String, Arc<dyn EmbeddingsProvider>)>,
    vector_stores: Vec<(String, Arc<dyn VectorStoreRetrieverProvider>)>,
    tools: Vec<(String, Arc<dyn ToolProvider>)>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry with the default preference lists.
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            embeddings_preference: Arc::new(
                EMBEDDINGS_PREFERENCE.iter().map(|s| (*s).to_owned()).collect(),
            ),
            vector_store_preference: Arc::new(
                VECTOR_STORE_PREFERENCE.iter().map(|s| (*s).to_owned()).collect(),
            ),
        }
    }

    /// Override the embeddings preference list. Configuration-time only;
    /// the list is immutable afterwards.
    pub fn with_embeddings_preference(mut self, names: Vec<String>) -> Self {
        self.embeddings_preference = Arc::new(names);
        self
    }

    /// Override the vector store preference list.
    pub fn with_vector_store_preference(mut self, names: Vec<String>) -> Self {
        self.vector_store_preference = Arc::new(names);
        self
    }

    /// Register a model provider under its declared name.
    ///
    /// A duplicate name overwrites the previous entry in place (providers
    /// register once at startup, so last-write-wins is acceptable).
    pub fn register_model(&self, provider: Arc<dyn ModelProvider>) -> Registration {
        let name = provider.name().to_owned();
        tracing::debug!("registering model provider `{name}`");
        upsert(&mut self.inner.write().models, name.clone(), provider);
        Registration {
            registry: self.clone(),
            kind: Kind::Model,
            name,
        }
    }

    /// Register an embeddings provider under its declared name.
    pub fn register_embeddings(&self, provider: Arc<dyn EmbeddingsProvider>) -> Registration {
        let name = provider.name().to_owned();
        tracing::debug!("registering embeddings provider `{name}`");
        upsert(&mut self.inner.write().embeddings, name.clone(), provider);
        Registration {
            registry: self.clone(),
            kind: Kind::Embeddings,
            name,
        }
    }

    /// Register a vector store retriever provider under its declared name.
    pub fn register_vector_store(
        &self,
        provider: Arc<dyn VectorStoreRetrieverProvider>,
    ) -> Registration {
        let name = provider.name().to_owned();
        tracing::debug!("registering vector store provider `{name}`");
        upsert(&mut self.inner.write().vector_stores, name.clone(), provider);
        Registration {
            registry: self.clone(),
            kind: Kind::VectorStore,
            name,
        }
    }

    /// Register a tool provider under its declared name.
    pub fn register_tool(&self, provider: Arc<dyn ToolProvider>) -> Registration {
        let name = provider.name().to_owned();
        tracing::debug!("registering tool provider `{name}`");
        upsert(&mut self.inner.write().tools, name.clone(), provider);
        Registration {
            registry: self.clone(),
            kind: Kind::Tool,
            name,
        }
    }

    /// Resolve a `"provider/model"` identifier to a model instance.
    pub async fn create_model(
        &self,
        mixed: &str,
        params: &CreateParams,
    ) -> Result<Arc<dyn ChatModel>> {
        Ok(self.create_model_and_provider(mixed, params).await?.1)
    }

    /// Resolve a `"provider/model"` identifier to the provider and the
    /// instantiated model.
    ///
    /// The identifier splits on the first `/`. Providers are scanned in
    /// registration order; the first whose name matches and whose
    /// `supports` check passes wins.
    pub async fn create_model_and_provider(
        &self,
        mixed: &str,
        params: &CreateParams,
    ) -> Result<(Arc<dyn ModelProvider>, Arc<dyn ChatModel>)> {
        let (provider_name, model_name) = split_mixed(mixed);

        for provider in self.model_providers() {
            if provider.name() == provider_name && provider.supports(model_name).await {
                let model = provider.create_model(model_name, params).await?;
                return Ok((provider, model));
            }
        }

        Err(Error::ProviderNotFound {
            kind: "model",
            name: mixed.to_owned(),
        })?
    }

    /// Resolve a `"provider/name"` identifier to an embeddings instance.
    pub async fn create_embeddings(
        &self,
        mixed: &str,
        params: &CreateParams,
    ) -> Result<Arc<dyn Embeddings>> {
        let (provider_name, embeddings_name) = split_mixed(mixed);
        tracing::debug!("creating embeddings `{embeddings_name}` with provider `{provider_name}`");

        for provider in self.embeddings_providers() {
            if provider.name() == provider_name && provider.supports(embeddings_name).await {
                return provider.create_embeddings(embeddings_name, params).await;
            }
        }

        Err(Error::ProviderNotFound {
            kind: "embeddings",
            name: mixed.to_owned(),
        })?
    }

    /// Resolve a `"provider/name"` identifier to a retriever, populating
    /// `params.embeddings` with the default embeddings when unset.
    pub async fn create_vector_store_retriever(
        &self,
        mixed: &str,
        mut params: CreateParams,
    ) -> Result<Arc<dyn Retriever>> {
        if params.embeddings.is_none() {
            params.embeddings = Some(self.default_embeddings(&params).await);
        }

        let (provider_name, _) = split_mixed(mixed);
        for provider in self.vector_store_providers() {
            if provider.name() == provider_name {
                return provider.create_retriever(&params).await;
            }
        }

        Err(Error::ProviderNotFound {
            kind: "vector store",
            name: mixed.to_owned(),
        })?
    }

    /// Resolve embeddings through the ranked preference list.
    ///
    /// Every candidate failure is logged and skipped. On exhaustion:
    /// exactly one registered provider is tried as a last resort;
    /// anything else falls back to [`NullEmbeddings`]. Never fails.
    pub async fn default_embeddings(&self, params: &CreateParams) -> Arc<dyn Embeddings> {
        for name in self.embeddings_preference.iter() {
            let Some(provider) = self.embeddings_provider(name) else {
                continue;
            };
            match try_create_embeddings(&provider, params).await {
                Ok(embeddings) => return embeddings,
                Err(err) => {
                    tracing::debug!("failed to create embeddings `{name}`, trying next: {err}");
                }
            }
        }

        let providers = self.embeddings_providers();
        if let [only] = providers.as_slice() {
            match try_create_embeddings(only, params).await {
                Ok(embeddings) => return embeddings,
                Err(err) => {
                    tracing::error!(
                        "cannot select embeddings, rolling back to null embeddings: {err}"
                    );
                    return Arc::new(NullEmbeddings);
                }
            }
        }

        tracing::error!("cannot select embeddings, rolling back to null embeddings");
        Arc::new(NullEmbeddings)
    }

    /// Resolve a retriever through the ranked preference list.
    ///
    /// Same walk as [`default_embeddings`](Self::default_embeddings);
    /// the terminal fallback is an [`InMemoryRetriever`]. Never fails.
    pub async fn default_vector_store_retriever(
        &self,
        mut params: CreateParams,
    ) -> Arc<dyn Retriever> {
        if params.embeddings.is_none() {
            params.embeddings = Some(self.default_embeddings(&params).await);
        }

        for name in self.vector_store_preference.iter() {
            let Some(provider) = self.vector_store_provider(name) else {
                continue;
            };
            match provider.create_retriever(&params).await {
                Ok(retriever) => return retriever,
                Err(err) => {
                    tracing::warn!(
                        "failed to create vector store retriever `{name}`, trying next: {err}"
                    );
                }
            }
        }

        let providers = self.vector_store_providers();
        if let [only] = providers.as_slice() {
            match only.create_retriever(&params).await {
                Ok(retriever) => return retriever,
                Err(err) => {
                    tracing::warn!(
                        "failed to create vector store retriever `{}`, rolling back to the \
                         in-memory retriever: {err}",
                        only.name()
                    );
                }
            }
        } else {
            tracing::warn!(
                "cannot select a vector store retriever, rolling back to the in-memory retriever"
            );
        }

        let embeddings = params
            .embeddings
            .unwrap_or_else(|| Arc::new(NullEmbeddings));
        Arc::new(InMemoryRetriever::new(embeddings))
    }

    /// Filter tool providers with a fallible predicate.
    ///
    /// A predicate error excludes that entry and is logged; the scan
    /// continues.
    pub fn select_tool_providers<F>(&self, mut filter: F) -> Vec<Arc<dyn ToolProvider>>
    where
        F: FnMut(&str, &Arc<dyn ToolProvider>) -> Result<bool>,
    {
        let entries: Vec<_> = self.inner.read().tools.clone();
        entries
            .into_iter()
            .filter_map(|(name, provider)| match filter(&name, &provider) {
                Ok(true) => Some(provider),
                Ok(false) => None,
                Err(err) => {
                    tracing::error!("predicate failed for tool provider `{name}`: {err}");
                    None
                }
            })
            .collect()
    }

    /// Filter model providers with a fallible async predicate.
    pub async fn select_model_providers<F, Fut>(&self, filter: F) -> Vec<Arc<dyn ModelProvider>>
    where
        F: Fn(&str, &Arc<dyn ModelProvider>) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let entries: Vec<_> = self.inner.read().models.clone();
        let mut selected = Vec::new();
        for (name, provider) in entries {
            match filter(&name, &provider).await {
                Ok(true) => selected.push(provider),
                Ok(false) => {}
                Err(err) => {
                    tracing::error!("predicate failed for model provider `{name}`: {err}");
                }
            }
        }
        selected
    }

    /// Filter embeddings providers with a fallible async predicate.
    pub async fn select_embeddings_providers<F, Fut>(
        &self,
        filter: F,
    ) -> Vec<Arc<dyn EmbeddingsProvider>>
    where
        F: Fn(&str, &Arc<dyn EmbeddingsProvider>) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let entries: Vec<_> = self.inner.read().embeddings.clone();
        let mut selected = Vec::new();
        for (name, provider) in entries {
            match filter(&name, &provider).await {
                Ok(true) => selected.push(provider),
                Ok(false) => {}
                Err(err) => {
                    tracing::error!("predicate failed for embeddings provider `{name}`: {err}");
                }
            }
        }
        selected
    }

    /// Filter vector store providers with a fallible async predicate.
    pub async fn select_vector_store_providers<F, Fut>(
        &self,
        filter: F,
    ) -> Vec<Arc<dyn VectorStoreRetrieverProvider>>
    where
        F: Fn(&str, &Arc<dyn VectorStoreRetrieverProvider>) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let entries: Vec<_> = self.inner.read().vector_stores.clone();
        let mut selected = Vec::new();
        for (name, provider) in entries {
            match filter(&name, &provider).await {
                Ok(true) => selected.push(provider),
                Ok(false) => {}
                Err(err) => {
                    tracing::error!("predicate failed for vector store provider `{name}`: {err}");
                }
            }
        }
        selected
    }

    fn model_providers(&self) -> Vec<Arc<dyn ModelProvider>> {
        self.inner.read().models.iter().map(|(_, p)| p.clone()).collect()
    }

    fn embeddings_providers(&self) -> Vec<Arc<dyn EmbeddingsProvider>> {
        self.inner.read().embeddings.iter().map(|(_, p)| p.clone()).collect()
    }

    fn vector_store_providers(&self) -> Vec<Arc<dyn VectorStoreRetrieverProvider>> {
        self.inner.read().vector_stores.iter().map(|(_, p)| p.clone()).collect()
    }

    fn embeddings_provider(&self, name: &str) -> Option<Arc<dyn EmbeddingsProvider>> {
        self.inner
            .read()
            .embeddings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
    }

    fn vector_store_provider(&self, name: &str) -> Option<Arc<dyn VectorStoreRetrieverProvider>> {
        self.inner
            .read()
            .vector_stores
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
    }
}

/// Attempt one embeddings provider: the explicitly named embeddings if
/// the caller gave one, else the provider's first listed embeddings.
async fn try_create_embeddings(
    provider: &Arc<dyn EmbeddingsProvider>,
    params: &CreateParams,
) -> Result<Arc<dyn Embeddings>> {
    let name = match &params.embeddings_name {
        Some(name) => name.clone(),
        None => provider
            .list_embeddings()
            .await
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("provider `{}` lists no embeddings", provider.name()))?,
    };
    provider.create_embeddings(&name, params).await
}

/// Split a `"provider/model"` identifier on the first `/`.
///
/// A name without `/` resolves with the whole string as the provider
/// name and an empty model name, which no provider supports.
fn split_mixed(mixed: &str) -> (&str, &str) {
    mixed.split_once('/').unwrap_or((mixed, ""))
}

fn upsert<T>(entries: &mut Vec<(String, T)>, name: String, value: T) {
    if let Some(existing) = entries.iter_mut().find(|(n, _)| *n == name) {
        // Last write wins; the scan position is preserved.
        existing.1 = value;
    } else {
        entries.push((name, value));
    }
}

/// The kind of provider a [`Registration`] refers to.
enum Kind {
    Model,
    Embeddings,
    VectorStore,
    Tool,
}

/// Deregistration handle returned by the register methods.
///
/// Deregistering stops offering the provider for new resolution and
/// disposes its resources. In-flight instances held elsewhere stay
/// valid until dropped.
#[must_use = "dropping the handle keeps the provider registered"]
pub struct Registration {
    registry: Registry,
    kind: Kind,
    name: String,
}

impl Registration {
    /// The registered provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove the entry from the registry and dispose the provider.
    pub async fn deregister(self) {
        tracing::debug!("deregistering provider `{}`", self.name);
        match self.kind {
            Kind::Model => {
                let removed = remove(&mut self.registry.inner.write().models, &self.name);
                if let Some(provider) = removed {
                    provider.dispose().await;
                }
            }
            Kind::Embeddings => {
                let removed = remove(&mut self.registry.inner.write().embeddings, &self.name);
                if let Some(provider) = removed {
                    provider.dispose().await;
                }
            }
            Kind::VectorStore => {
                let removed = remove(&mut self.registry.inner.write().vector_stores, &self.name);
                if let Some(provider) = removed {
                    provider.dispose().await;
                }
            }
            Kind::Tool => {
                remove(&mut self.registry.inner.write().tools, &self.name);
            }
        }
    }
}

fn remove<T>(entries: &mut Vec<(String, T)>, name: &str) -> Option<T> {
    let index = entries.iter().position(|(n, _)| n == name)?;
    Some(entries.remove(index).1)
}

#[cfg(test)]
mod tests {
    use super::split_mixed;

    #[test]
    fn split_on_first_slash_only() {
        assert_eq!(split_mixed("openai/gpt-4"), ("openai", "gpt-4"));
        assert_eq!(split_mixed("local/models/llama"), ("local", "models/llama"));
        assert_eq!(split_mixed("bare"), ("bare", ""));
    }
}
