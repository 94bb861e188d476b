//! Continuous evaluation
//!
//! Crash-only supervisor around [`EvaluationRound`]: every loop round
//! reshuffles the posts and evaluates each one in turn. A round that fails
//! partway is not resumed; the next round starts from a fresh shuffle after
//! a backoff. The loop ends when the consecutive-failure budget runs out or
//! an optional round limit is reached.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::eval::round::EvaluationRound;
use crate::types::{PostRecord, RoundReport};

/// Evaluates one held-out post
#[async_trait]
pub trait PostEvaluator: Send + Sync {
    async fn evaluate(&self, post: &PostRecord) -> Result<RoundReport>;
}

#[async_trait]
impl PostEvaluator for EvaluationRound<'_> {
    async fn evaluate(&self, post: &PostRecord) -> Result<RoundReport> {
        self.run(post).await
    }
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub max_consecutive_errors: u32,
    pub backoff: Duration,
    /// Keep only the first N posts, before any shuffling. `Some(0)` is the
    /// same as `None`.
    pub post_limit: Option<usize>,
    /// Stop after this many successful rounds; `None` runs until the error
    /// budget is spent
    pub max_rounds: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 3,
            backoff: Duration::from_secs(10),
            post_limit: None,
            max_rounds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ErrorBudgetExhausted,
    RoundLimitReached,
}

#[derive(Debug, Clone)]
pub struct LoopSummary {
    pub rounds_completed: u64,
    pub posts_evaluated: u64,
    pub failed_rounds: u64,
    pub stop: StopReason,
}

pub async fn run_continuous<E>(
    evaluator: &E,
    mut posts: Vec<PostRecord>,
    settings: &LoopSettings,
) -> Result<LoopSummary>
where
    E: PostEvaluator + ?Sized,
{
    if settings.max_consecutive_errors == 0 {
        return Err(Error::InvalidInput(
            "max consecutive errors must be at least 1".into(),
        ));
    }
    info!("Loaded {} posts from the database", posts.len());

    // zero means no limit
    if let Some(limit) = settings.post_limit.filter(|&limit| limit > 0) {
        posts.truncate(limit);
        info!("Using a limit of {} posts for evaluation", posts.len());
    }
    if posts.is_empty() {
        return Err(Error::StoreUnavailable(
            "no posts found in the database".into(),
        ));
    }

    let mut summary = LoopSummary {
        rounds_completed: 0,
        posts_evaluated: 0,
        failed_rounds: 0,
        stop: StopReason::ErrorBudgetExhausted,
    };
    let mut consecutive_errors = 0u32;
    let mut round = 1u64;

    loop {
        if settings.max_rounds.is_some_and(|max| summary.rounds_completed >= max) {
            info!("Completed {} rounds, stopping", summary.rounds_completed);
            summary.stop = StopReason::RoundLimitReached;
            return Ok(summary);
        }

        info!("--- Starting evaluation round {} ---", round);
        posts.shuffle(&mut rand::thread_rng());

        match run_round(evaluator, &posts, &mut summary).await {
            Ok(()) => {
                consecutive_errors = 0;
                summary.rounds_completed += 1;
                info!("--- Completed evaluation round {} ---", round);
                round += 1;
            }
            Err(e) => {
                consecutive_errors += 1;
                summary.failed_rounds += 1;
                error!(
                    consecutive_errors,
                    "Round {} failed ({}/{}): {e}",
                    round,
                    consecutive_errors,
                    settings.max_consecutive_errors
                );
                if consecutive_errors >= settings.max_consecutive_errors {
                    error!(
                        "Reached {} consecutive errors, stopping evaluation",
                        consecutive_errors
                    );
                    summary.stop = StopReason::ErrorBudgetExhausted;
                    return Ok(summary);
                }
                warn!("Retrying in {:?}", settings.backoff);
                tokio::time::sleep(settings.backoff).await;
            }
        }
    }
}

async fn run_round<E>(evaluator: &E, posts: &[PostRecord], summary: &mut LoopSummary) -> Result<()>
where
    E: PostEvaluator + ?Sized,
{
    for (i, post) in posts.iter().enumerate() {
        info!("Post {}/{}: \"{}\"", i + 1, posts.len(), post.title);
        evaluator.evaluate(post).await?;
        summary.posts_evaluated += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Fails or succeeds per call according to a script; succeeds once the
    /// script is exhausted.
    #[derive(Default)]
    struct FlakyEvaluator {
        script: Mutex<VecDeque<bool>>,
        seen: Mutex<Vec<String>>,
    }

    impl FlakyEvaluator {
        fn new(script: &[bool]) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PostEvaluator for FlakyEvaluator {
        async fn evaluate(&self, post: &PostRecord) -> Result<RoundReport> {
            self.seen.lock().unwrap().push(post.id.clone());
            let ok = self.script.lock().unwrap().pop_front().unwrap_or(true);
            if !ok {
                return Err(Error::NoScores);
            }
            Ok(RoundReport {
                post_id: post.id.clone(),
                post_title: post.title.clone(),
                probe_topic: post.probe_topic(),
                average: 0.5,
                failures: 0,
                adjustments: vec![],
            })
        }
    }

    fn posts(n: usize) -> Vec<PostRecord> {
        (0..n)
            .map(|i| PostRecord {
                id: format!("p{i}"),
                title: format!("Post {i}"),
                blog_title: String::new(),
                date: "2019-09-09T00:00:00Z".parse().unwrap(),
                content: "text".into(),
                keywords: vec![],
            })
            .collect()
    }

    fn settings(max_errors: u32, max_rounds: Option<u64>) -> LoopSettings {
        LoopSettings {
            max_consecutive_errors: max_errors,
            backoff: Duration::ZERO,
            post_limit: None,
            max_rounds,
        }
    }

    #[tokio::test]
    async fn test_stops_after_consecutive_failures() {
        let evaluator = FlakyEvaluator::new(&[false, false, false, true]);
        let summary = run_continuous(&evaluator, posts(1), &settings(3, None))
            .await
            .unwrap();

        assert_eq!(summary.stop, StopReason::ErrorBudgetExhausted);
        assert_eq!(summary.failed_rounds, 3);
        assert_eq!(summary.rounds_completed, 0);
        assert_eq!(evaluator.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_success_resets_error_counter() {
        // fail, fail, ok, fail, fail, fail
        let evaluator = FlakyEvaluator::new(&[false, false, true, false, false, false]);
        let summary = run_continuous(&evaluator, posts(1), &settings(3, None))
            .await
            .unwrap();

        assert_eq!(summary.rounds_completed, 1);
        assert_eq!(summary.failed_rounds, 5);
        assert_eq!(evaluator.seen().len(), 6);
    }

    #[tokio::test]
    async fn test_round_limit_visits_every_post_each_round() {
        let evaluator = FlakyEvaluator::new(&[]);
        let summary = run_continuous(&evaluator, posts(3), &settings(3, Some(2)))
            .await
            .unwrap();

        assert_eq!(summary.stop, StopReason::RoundLimitReached);
        assert_eq!(summary.rounds_completed, 2);
        assert_eq!(summary.posts_evaluated, 6);

        let seen = evaluator.seen();
        for id in ["p0", "p1", "p2"] {
            assert_eq!(seen.iter().filter(|s| *s == id).count(), 2);
        }
    }

    #[tokio::test]
    async fn test_failed_round_abandons_remaining_posts() {
        // second post of the first round fails; the next round restarts
        let evaluator = FlakyEvaluator::new(&[true, false]);
        let summary = run_continuous(&evaluator, posts(3), &settings(3, Some(1)))
            .await
            .unwrap();

        assert_eq!(summary.failed_rounds, 1);
        assert_eq!(summary.rounds_completed, 1);
        assert_eq!(evaluator.seen().len(), 2 + 3);
    }

    #[tokio::test]
    async fn test_post_limit_truncates_before_shuffle() {
        let evaluator = FlakyEvaluator::new(&[]);
        let settings = LoopSettings {
            post_limit: Some(2),
            ..settings(3, Some(1))
        };
        run_continuous(&evaluator, posts(5), &settings).await.unwrap();

        let mut seen = evaluator.seen();
        seen.sort();
        assert_eq!(seen, vec!["p0", "p1"]);
    }

    #[tokio::test]
    async fn test_zero_post_limit_means_no_limit() {
        let evaluator = FlakyEvaluator::new(&[false, false, false]);
        let settings = LoopSettings {
            post_limit: Some(0),
            ..settings(3, Some(100_000))
        };
        let summary = run_continuous(&evaluator, posts(4), &settings).await.unwrap();

        // every round reached the evaluator, so the failures were counted
        assert_eq!(summary.stop, StopReason::ErrorBudgetExhausted);
        assert_eq!(summary.rounds_completed, 0);
        assert_eq!(summary.failed_rounds, 3);
        assert_eq!(evaluator.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_store_unavailable() {
        let evaluator = FlakyEvaluator::new(&[]);
        let result = run_continuous(&evaluator, Vec::new(), &settings(3, None)).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert!(evaluator.seen().is_empty());
    }
}
