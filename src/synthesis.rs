//! Style prompt synthesis
//!
//! Offline pass that turns batches of the author's posts into candidate
//! style prompts. Each batch becomes one conversation: the task, one message
//! per post, then a trigger asking for the prompt. Every reply is persisted
//! as soon as it arrives, so an interrupted pass keeps what it produced.

use rand::seq::SliceRandom;
use tracing::info;

use crate::error::{Error, Result};
use crate::llm::{ChatMessage, LanguageModel, LlmError};
use crate::repository::StyleRepository;
use crate::types::{PostRecord, StyleDescription};

pub const DEFAULT_BATCH_SIZE: usize = 10;

const ANALYZE_INSTRUCTION: &str = "\
You are a style analyzer. Analyze the following blog posts and create a system prompt that \
captures their common writing style. Include information about tone, sentence structure and \
length, paragraph length, and other specifics of a person's writing style. Don't focus on the \
content of the posts, only the style.

The goal is to be able to replicate this writing style with high precision regardless of the topic.

Return ONLY the system prompt text. Do not add any explanations, introductions, or JSON formatting.

Example of correct format:
You are a professional writer...

I will send you the posts one by one. After I've sent all posts, I'll ask you to generate the \
style prompt. Please wait for all posts before generating the prompt.";

const TRIGGER: &str = "I have sent you all the posts. Please generate the style prompt now.";

pub struct StyleSynthesizer<'a> {
    model: &'a dyn LanguageModel,
    repo: &'a StyleRepository,
}

impl<'a> StyleSynthesizer<'a> {
    pub fn new(model: &'a dyn LanguageModel, repo: &'a StyleRepository) -> Self {
        Self { model, repo }
    }

    /// Ask the model for one style prompt describing `posts`.
    pub async fn synthesize(&self, posts: &[PostRecord]) -> Result<String> {
        let messages = build_messages(posts);
        let reply = self.model.chat(&messages).await?;
        let text = reply.trim();
        if text.is_empty() {
            return Err(LlmError::Provider("model returned an empty style prompt".into()).into());
        }
        Ok(text.to_string())
    }

    /// Shuffle the corpus once, optionally keep only the first `limit`
    /// posts, and synthesize one description per batch. A model failure
    /// aborts the remaining batches; descriptions already saved stay.
    pub async fn create_all(
        &self,
        posts: &[PostRecord],
        batch_size: usize,
        limit: Option<usize>,
    ) -> Result<Vec<StyleDescription>> {
        if batch_size == 0 {
            return Err(Error::InvalidInput("batch size must be at least 1".into()));
        }
        if posts.is_empty() {
            return Err(Error::StoreUnavailable("no posts found in database".into()));
        }

        let mut shuffled = posts.to_vec();
        shuffled.shuffle(&mut rand::thread_rng());
        if let Some(limit) = limit {
            shuffled.truncate(limit);
        }

        let total_batches = shuffled.len().div_ceil(batch_size);
        let mut created = Vec::with_capacity(total_batches);

        for (batch, chunk) in shuffled.chunks(batch_size).enumerate() {
            info!(
                "Processing batch {}/{} ({} posts)",
                batch + 1,
                total_batches,
                chunk.len()
            );
            let text = self.synthesize(chunk).await?;
            created.push(self.repo.append(&text)?);
        }

        Ok(created)
    }
}

fn build_messages(posts: &[PostRecord]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(posts.len() + 2);
    messages.push(ChatMessage::user(ANALYZE_INSTRUCTION));
    for (i, post) in posts.iter().enumerate() {
        messages.push(ChatMessage::user(format!(
            "Post {}:\nTitle: \"{}\"\nDate: {}\nContent:\n{}",
            i + 1,
            post.title,
            post.date.to_rfc3339(),
            post.content
        )));
    }
    messages.push(ChatMessage::user(TRIGGER));
    messages
}
