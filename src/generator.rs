//! Post generation in the author's voice
//!
//! Conversation layout: the style prompt as the system message, an
//! announcement that source posts follow, one message per relevant post,
//! then the writing instruction. The reply is streamed and concatenated in
//! arrival order.

use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::llm::{collect_stream, ChatMessage, LanguageModel, LlmError};
use crate::relevance;
use crate::repository::StyleRepository;
use crate::types::{PostRecord, RelevantPost, StyleDescription, StyleSelection};

/// Returned in place of post text when the model could not be reached.
pub const GENERATION_ERROR_MARKER: &str =
    "Error generating blog post. Please check AI model setup and logs.";

/// Used when the chosen style prompt has no text.
pub const DEFAULT_STYLE: &str = "You are a professional blog writer. Write a blog post that is \
engaging, informative, and well-structured.";

/// Result of a generation request. A model failure is reported as a value,
/// not an error, so callers must check before treating the text as a post.
#[derive(Debug)]
pub enum GeneratedPost {
    Content(String),
    ModelFailure(LlmError),
}

impl GeneratedPost {
    /// Post text, or [`GENERATION_ERROR_MARKER`] on model failure.
    pub fn text(&self) -> &str {
        match self {
            GeneratedPost::Content(text) => text,
            GeneratedPost::ModelFailure(_) => GENERATION_ERROR_MARKER,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, GeneratedPost::ModelFailure(_))
    }

    pub fn into_result(self) -> std::result::Result<String, LlmError> {
        match self {
            GeneratedPost::Content(text) => Ok(text),
            GeneratedPost::ModelFailure(e) => Err(e),
        }
    }
}

pub struct Generator<'a> {
    model: &'a dyn LanguageModel,
    repo: &'a StyleRepository,
    posts: &'a [PostRecord],
}

impl<'a> Generator<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        repo: &'a StyleRepository,
        posts: &'a [PostRecord],
    ) -> Self {
        Self { model, repo, posts }
    }

    pub async fn generate(&self, topic: &str, selection: StyleSelection) -> Result<GeneratedPost> {
        self.generate_streaming(topic, selection, |_| {}).await
    }

    /// Like [`Generator::generate`], forwarding every chunk to `on_chunk`
    /// as it arrives.
    pub async fn generate_streaming(
        &self,
        topic: &str,
        selection: StyleSelection,
        on_chunk: impl FnMut(&str) + Send,
    ) -> Result<GeneratedPost> {
        check_topic(topic)?;

        let style = match selection {
            StyleSelection::Index(index) => self.repo.get(index)?,
            StyleSelection::Best => self.repo.best()?,
        };
        info!(
            index = style.index,
            fitness = style.fitness,
            "Using system prompt from {}",
            style.prompt_file
        );

        self.generate_with_style(topic, &style, on_chunk).await
    }

    /// Generate with an already loaded style description.
    pub async fn generate_with_style(
        &self,
        topic: &str,
        style: &StyleDescription,
        mut on_chunk: impl FnMut(&str) + Send,
    ) -> Result<GeneratedPost> {
        check_topic(topic)?;

        let relevant: Vec<RelevantPost> = relevance::select(self.posts, topic)
            .iter()
            .map(RelevantPost::from)
            .collect();
        info!("Found {} relevant posts in the database", relevant.len());
        if relevant.is_empty() {
            warn!("No relevant past posts - generating without source material");
        }

        let style_text = if style.text.trim().is_empty() {
            warn!(index = style.index, "Style prompt is empty, using the default");
            DEFAULT_STYLE
        } else {
            style.text.as_str()
        };

        let messages = build_messages(topic, style_text, &relevant);

        let outcome = match self.model.chat_stream(&messages).await {
            Ok(stream) => collect_stream(stream, &mut on_chunk).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(text) => Ok(GeneratedPost::Content(text)),
            Err(e) => {
                error!("Error communicating with the language model: {e}");
                if matches!(e, LlmError::ConnectionRefused(_)) {
                    error!("Connection refused. Is the Ollama server running?");
                }
                Ok(GeneratedPost::ModelFailure(e))
            }
        }
    }
}

fn check_topic(topic: &str) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(Error::InvalidInput("prompt cannot be empty".into()));
    }
    Ok(())
}

fn format_source_post(post: &RelevantPost) -> String {
    let keywords = if post.keywords.is_empty() {
        "N/A".to_string()
    } else {
        post.keywords.join(", ")
    };
    format!(
        "Title: \"{}\"\nDate: {}\nKeywords: {}\nContent:\n{}\n\n---",
        post.title,
        post.date.to_rfc3339(),
        keywords,
        post.content
    )
}

fn build_messages(topic: &str, style_text: &str, relevant: &[RelevantPost]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(relevant.len() + 3);
    messages.push(ChatMessage::system(style_text));
    messages.push(ChatMessage::user(format!(
        "I am about to send you a series of posts related to {topic}. Each one will be in its own message."
    )));
    messages.extend(relevant.iter().map(|p| ChatMessage::user(format_source_post(p))));
    messages.push(ChatMessage::user(format!(
        "Please write a new blog post on {topic}. The post should use the content I just sent as \
         source material, following the system prompt guidelines.\n\n\
         Only post content should be returned. No additional text or explanations."
    )));
    messages
}
