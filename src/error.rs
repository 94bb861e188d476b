//! Error kinds for the generation and evaluation pipeline
//!
//! Recovery policy lives with the callers: `ParseFailure` is always folded
//! into a 0.0 likeness score, per-description failures are folded into 0.0
//! inside a round, and only whole-round failures reach the continuous loop.

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum Error {
    /// Empty topic or prompt
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Style index out of range, or a referenced file is missing
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no style prompts found - run `create-prompts` first")]
    NoStylePrompts,

    /// Language model refused the connection or the call failed
    #[error("language model unavailable: {0}")]
    ModelUnavailable(#[from] LlmError),

    /// Judge reply carried no usable number
    #[error("could not parse a score from reply: {0:?}")]
    ParseFailure(String),

    /// Corpus file missing, unreadable or corrupt
    #[error("corpus store unavailable: {0}")]
    StoreUnavailable(String),

    /// Every description in a round failed to produce a sample
    #[error("no style prompt produced a scorable sample this round")]
    NoScores,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the failure came from the language model connection.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, Error::ModelUnavailable(_))
    }
}
