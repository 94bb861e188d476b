//! LLM-as-judge likeness scoring
//!
//! The judge sees the original post and a generated sample and answers with
//! a bare number in `[0.0, 1.0]`. Judge replies are noisy, so [`LikenessScorer::score`]
//! never fails: anything it cannot read becomes `0.0`.

use tracing::{debug, warn};

use crate::error::Result;
use crate::extract::extract_score;
use crate::llm::{ChatMessage, LanguageModel};

pub struct LikenessScorer<'a> {
    model: &'a dyn LanguageModel,
}

impl<'a> LikenessScorer<'a> {
    pub fn new(model: &'a dyn LanguageModel) -> Self {
        Self { model }
    }

    /// Ask the judge and parse its reply. Errors are returned as-is; most
    /// callers want [`LikenessScorer::score`].
    pub async fn judge(&self, original: &str, generated: &str) -> Result<f64> {
        if generated.trim().is_empty() {
            return Ok(0.0);
        }

        let prompt = build_judge_prompt(original, generated);
        let reply = self.model.chat(&[ChatMessage::user(prompt)]).await?;
        debug!(reply = %reply.trim(), "Judge replied");
        extract_score(&reply)
    }

    /// Likeness in `[0.0, 1.0]`; model and parse failures yield `0.0`.
    pub async fn score(&self, original: &str, generated: &str) -> f64 {
        match self.judge(original, generated).await {
            Ok(score) => score,
            Err(e) => {
                warn!("Could not get likeness score, counting as 0.0: {e}");
                0.0
            }
        }
    }
}

fn build_judge_prompt(original: &str, generated: &str) -> String {
    format!(
        r#"You are a text analysis expert. Compare the writing style of the following two blog posts.
The first is the 'Original Post' and the second is the 'Generated Post'.
Provide a likeness score from 0.0 to 1.0, where 1.0 means the styles are identical and 0.0 means they are completely different.
IMPORTANT: Only return the numerical score and nothing else. Do not add any explanation or context.

Original Post:
---
{original}
---

Generated Post:
---
{generated}
---
"#
    )
}
