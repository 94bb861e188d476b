//! Scripted language model for unit tests

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::{ChatMessage, LanguageModel, LlmError, LlmResult, TextStream};

/// One queued reply
pub enum Reply {
    Text(String),
    /// Streamed as these chunks, in order
    Chunks(Vec<String>),
    Refused,
}

/// Replays queued replies in order and records every conversation it is
/// sent. When the queue runs dry it answers with `fallback`, or refuses the
/// connection if no fallback is set.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with the same text.
    pub fn always(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Refuse every call.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Reply::Text(text.to_string()))
    }

    pub fn chunks(self, chunks: &[&str]) -> Self {
        self.push(Reply::Chunks(chunks.iter().map(|c| c.to_string()).collect()))
    }

    pub fn refuse(self) -> Self {
        self.push(Reply::Refused)
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, messages: &[ChatMessage]) -> LlmResult<Vec<String>> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(vec![text]),
            Some(Reply::Chunks(chunks)) => Ok(chunks),
            Some(Reply::Refused) => Err(LlmError::ConnectionRefused("scripted".into())),
            None => match &self.fallback {
                Some(text) => Ok(vec![text.clone()]),
                None => Err(LlmError::ConnectionRefused("scripted".into())),
            },
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn chat(&self, messages: &[ChatMessage]) -> LlmResult<String> {
        self.next(messages).map(|chunks| chunks.concat())
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> LlmResult<TextStream> {
        let chunks = self.next(messages)?;
        Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}
