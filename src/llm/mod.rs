//! Language model boundary
//!
//! The pipeline treats the model as a black-box oracle: an ordered list of
//! role-tagged messages goes in, text comes out, either whole or as a
//! stream of increments in arrival order.

pub mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    /// Nothing is listening at the configured endpoint
    #[error("connection refused by {0} - is the model server running?")]
    ConnectionRefused(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("serialisation error: {0}")]
    Serialisation(String),

    #[error("request timed out")]
    Timeout,
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Incremental text chunks in arrival order
pub type TextStream = BoxStream<'static, LlmResult<String>>;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send the conversation and wait for the full reply.
    async fn chat(&self, messages: &[ChatMessage]) -> LlmResult<String>;

    /// Send the conversation and receive the reply incrementally.
    async fn chat_stream(&self, messages: &[ChatMessage]) -> LlmResult<TextStream>;
}

/// Drain a stream into one string, forwarding every chunk to `on_chunk`
/// first. Chunks are never reordered or dropped.
pub async fn collect_stream(
    mut stream: TextStream,
    mut on_chunk: impl FnMut(&str),
) -> LlmResult<String> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        on_chunk(&chunk);
        text.push_str(&chunk);
    }
    Ok(text)
}
