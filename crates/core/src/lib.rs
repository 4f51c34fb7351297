//! Core types and traits for the narwhal conversation runtime.

pub use {
    action::Action,
    embeddings::{Embeddings, NullEmbeddings},
    error::Error,
    limits::default_context_limit,
    message::{ChatMessage, FunctionCall, Role},
    model::{ChatModel, GenerateOptions, ModelResponse},
    provider::{
        ChatMode, CreateParams, EmbeddingsProvider, ModelProvider, ToolContext, ToolProvider,
        VectorStoreRetrieverProvider,
    },
    retriever::{Document, InMemoryRetriever, Retriever},
    tool::{Tool, ToolSpec},
};

mod action;
mod embeddings;
mod error;
mod limits;
mod message;
mod model;
mod provider;
mod retriever;
mod tool;

#[cfg(feature = "testing")]
pub mod testing;
