//! ghostwriter - writes new posts in an author's voice
//!
//! Learns a set of candidate style prompts from the author's back catalogue,
//! then keeps ranking them by how closely samples written under each prompt
//! resemble the real posts.
//!
//! # Pipeline
//!
//! ```text
//! import ──► CorpusStore ──► StyleSynthesizer ──► StyleRepository
//!                 │                                   ▲      │
//!                 ▼                                   │      ▼
//!        run_continuous ──► EvaluationRound ──► fitness   Generator ──► post
//!                                 │
//!                    Generator + LikenessScorer
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ghostwriter::{CorpusStore, Generator, OllamaClient, StyleRepository, StyleSelection};
//!
//! let model = OllamaClient::new("http://localhost:11434", "llama3", timeout)?;
//! let posts = CorpusStore::new(&posts_path).load()?;
//! let repo = StyleRepository::new(&index_path, &prompts_dir);
//!
//! let post = Generator::new(&model, &repo, &posts)
//!     .generate("remote work", StyleSelection::Best)
//!     .await?;
//! println!("{}", post.text());
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod eval;
pub mod extract;
pub mod generator;
pub mod ingest;
pub mod llm;
pub mod relevance;
pub mod report;
pub mod repository;
pub mod storage;
pub mod synthesis;
pub mod types;
pub mod wxr;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{load_config, resolve_config, Config};
pub use corpus::CorpusStore;
pub use error::{Error, Result};
pub use generator::{GeneratedPost, Generator, GENERATION_ERROR_MARKER};
pub use llm::{ChatMessage, LanguageModel, LlmError, OllamaClient, Role};
pub use repository::StyleRepository;
pub use synthesis::StyleSynthesizer;
pub use types::*;
