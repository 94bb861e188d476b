//! One evaluation round: every style description against one held-out post
//!
//! Each description generates a sample on the post's probe topic, the judge
//! scores it against the real post, and fitness moves by the score's
//! distance from the round average. Per round the deltas sum to zero, so
//! fitness tracks relative standing rather than judge calibration.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::eval::likeness::LikenessScorer;
use crate::generator::Generator;
use crate::llm::LanguageModel;
use crate::repository::StyleRepository;
use crate::types::{FitnessAdjustment, PostRecord, RoundReport, ScoreEntry, StyleDescription};

pub struct EvaluationRound<'a> {
    model: &'a dyn LanguageModel,
    repo: &'a StyleRepository,
    posts: &'a [PostRecord],
}

impl<'a> EvaluationRound<'a> {
    /// `posts` is the source corpus handed to the generator.
    pub fn new(
        model: &'a dyn LanguageModel,
        repo: &'a StyleRepository,
        posts: &'a [PostRecord],
    ) -> Self {
        Self { model, repo, posts }
    }

    /// Score every description against `held_out`, apply the relative
    /// update and persist the repository.
    pub async fn run(&self, held_out: &PostRecord) -> Result<RoundReport> {
        let mut descriptions = self.repo.entries()?;
        if descriptions.is_empty() {
            return Err(Error::NoStylePrompts);
        }
        info!(
            "Evaluating {} system prompts against \"{}\"",
            descriptions.len(),
            held_out.title
        );

        let topic = held_out.probe_topic();
        let mut outcomes = Vec::with_capacity(descriptions.len());
        for description in &descriptions {
            info!(
                index = description.index,
                "Evaluating prompt {}/{}",
                description.index + 1,
                descriptions.len()
            );
            let outcome = self.score_one(held_out, &topic, description).await;
            outcomes.push((description.index, outcome));
        }

        let failures = outcomes.iter().filter(|(_, o)| o.is_err()).count();
        if failures == outcomes.len() {
            return Err(Error::NoScores);
        }

        let entries: Vec<ScoreEntry> = outcomes
            .into_iter()
            .map(|(index, outcome)| {
                let score = outcome.unwrap_or_else(|e| {
                    warn!(index, "Prompt could not be evaluated, scoring 0.0: {e}");
                    0.0
                });
                info!(index, score, "Likeness score for prompt {}: {:.2}", index + 1, score);
                ScoreEntry { index, score }
            })
            .collect();

        let average = average(&entries);
        info!("Average likeness score for this round: {:.2}", average);

        let adjustments = apply_relative_update(&mut descriptions, &entries);
        for a in &adjustments {
            info!(
                "Prompt #{}: score {:.2} ({:+.2} vs avg), fitness {:.2}",
                a.index + 1,
                a.likeness,
                a.delta,
                a.new_fitness
            );
        }

        self.repo.replace_all(&descriptions)?;
        info!("Updated prompt scores in {}", self.repo.index_path().display());

        Ok(RoundReport {
            post_id: held_out.id.clone(),
            post_title: held_out.title.clone(),
            probe_topic: topic,
            average,
            failures,
            adjustments,
        })
    }

    /// An unreadable prompt text or a generation failure is an `Err`; judge
    /// failure is already folded to 0.0.
    async fn score_one(
        &self,
        held_out: &PostRecord,
        topic: &str,
        entry: &StyleDescription,
    ) -> Result<f64> {
        let description = StyleDescription {
            text: self.repo.text_of(entry)?,
            ..entry.clone()
        };
        let generator = Generator::new(self.model, self.repo, self.posts);
        let sample = generator
            .generate_with_style(topic, &description, |_| {})
            .await?
            .into_result()?;

        let scorer = LikenessScorer::new(self.model);
        Ok(scorer.score(&held_out.content, &sample).await)
    }
}

fn average(entries: &[ScoreEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| e.score).sum::<f64>() / entries.len() as f64
}

/// Move every scored description's fitness by `score - average`.
/// Entries pointing outside `descriptions` are ignored.
pub fn apply_relative_update(
    descriptions: &mut [StyleDescription],
    entries: &[ScoreEntry],
) -> Vec<FitnessAdjustment> {
    let average = average(entries);
    let mut adjustments = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(description) = descriptions.get_mut(entry.index) else {
            continue;
        };
        let delta = entry.score - average;
        let old_fitness = description.fitness;
        description.fitness += delta;
        adjustments.push(FitnessAdjustment {
            index: entry.index,
            prompt_file: description.prompt_file.clone(),
            likeness: entry.score,
            delta,
            old_fitness,
            new_fitness: description.fitness,
        });
    }

    adjustments
}
