//! Style prompt evaluation
//!
//! - `likeness`: LLM-as-judge comparison of a sample against a real post
//! - `round`: one held-out post against every style prompt, with the
//!   average-relative fitness update
//! - `continuous`: the long-running supervisor over shuffled posts

pub mod continuous;
pub mod likeness;
pub mod round;

pub use continuous::{run_continuous, LoopSettings, LoopSummary, PostEvaluator, StopReason};
pub use likeness::LikenessScorer;
pub use round::{apply_relative_update, EvaluationRound};
