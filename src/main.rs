//! ghostwriter CLI
//!
//! ```bash
//! ghostwriter generate --prompt "remote work"
//! ghostwriter create-prompts --limit 40
//! ghostwriter evaluate --max-errors 5
//! ghostwriter rankings
//! ```
//!
//! Generated text and reports go to stdout; logs go to stderr.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use ghostwriter::eval::{run_continuous, EvaluationRound, LoopSettings, PostEvaluator, StopReason};
use ghostwriter::{
    report, resolve_config, Config, CorpusStore, Error, GeneratedPost, Generator, OllamaClient,
    RoundReport, StyleRepository, StyleSelection, StyleSynthesizer, GENERATION_ERROR_MARKER,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ghostwriter",
    version,
    about = "Write new posts in an author's voice, using self-ranked style prompts"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./ghostwriter.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a new post on a topic, streaming it to stdout.
    Generate {
        /// The prompt or topic for the blog post
        #[arg(long)]
        prompt: String,

        /// Use this style prompt instead of the best-ranked one
        #[arg(long, alias = "promptIndex")]
        prompt_index: Option<usize>,
    },

    /// Synthesize style prompts from batches of past posts.
    CreatePrompts {
        /// Only use the first N posts of the shuffled corpus
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,

        /// Posts per style prompt
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        batch_size: Option<u64>,
    },

    /// Continuously rank style prompts against held-out posts.
    Evaluate {
        /// Stop after this many consecutive failed rounds
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_errors: Option<u32>,

        /// Only evaluate against the first N posts (0 means all)
        #[arg(long)]
        post_limit: Option<usize>,

        /// Stop after N successful rounds
        #[arg(long)]
        rounds: Option<u64>,
    },

    /// List style prompts by fitness.
    Rankings,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Build the model client and log a hint if the server is not reachable.
async fn connect(config: &Config) -> Result<OllamaClient> {
    let client = OllamaClient::new(
        &config.model.base_url,
        &config.model.name,
        config.model.timeout(),
    )
    .context("Failed to build Ollama client")?;
    info!(model = client.model(), "Using Ollama at {}", config.model.base_url);

    if let Err(e) = client.health_check().await {
        warn!("Ollama health check failed: {e}");
        warn!(
            "Make sure `ollama serve` is running at {} and `ollama pull {}` has been done",
            config.model.base_url, config.model.name
        );
    }
    Ok(client)
}

fn open_repository(config: &Config) -> StyleRepository {
    StyleRepository::new(config.style_index_path(), config.prompts_dir())
}

fn load_posts(config: &Config) -> Result<Vec<ghostwriter::PostRecord>> {
    let store = CorpusStore::new(config.posts_path());
    let posts = store.load()?;
    info!("Loaded {} posts from {}", posts.len(), store.path().display());
    Ok(posts)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            prompt,
            prompt_index,
        } => run_generate(&config, &prompt, prompt_index.into()).await,
        Commands::CreatePrompts { limit, batch_size } => {
            run_create_prompts(&config, limit, batch_size).await
        }
        Commands::Evaluate {
            max_errors,
            post_limit,
            rounds,
        } => run_evaluate(&config, max_errors, post_limit, rounds).await,
        Commands::Rankings => run_rankings(&config),
    }
}

async fn run_generate(config: &Config, prompt: &str, selection: StyleSelection) -> Result<()> {
    info!("Prompt received: \"{prompt}\"");
    let client = connect(config).await?;
    let posts = load_posts(config)?;
    let repo = open_repository(config);
    let generator = Generator::new(&client, &repo, &posts);

    let mut stdout = std::io::stdout();
    let post = generator
        .generate_streaming(prompt, selection, |chunk| {
            let _ = stdout.write_all(chunk.as_bytes());
            let _ = stdout.flush();
        })
        .await?;

    match post {
        GeneratedPost::Content(_) => {
            println!();
            Ok(())
        }
        GeneratedPost::ModelFailure(e) => {
            println!("{GENERATION_ERROR_MARKER}");
            bail!("generation failed: {e}")
        }
    }
}

async fn run_create_prompts(
    config: &Config,
    limit: Option<u64>,
    batch_size: Option<u64>,
) -> Result<()> {
    let client = connect(config).await?;
    let posts = load_posts(config)?;
    let repo = open_repository(config);

    let batch_size = batch_size.map_or(config.synthesis.batch_size, |b| b as usize);
    let limit = limit.map(|l| l as usize);

    let created = StyleSynthesizer::new(&client, &repo)
        .create_all(&posts, batch_size, limit)
        .await
        .context("Style prompt synthesis stopped")?;

    println!(
        "Created {} style prompts in {}",
        created.len(),
        config.prompts_dir().display()
    );
    Ok(())
}

/// Prints each round's outcome as it completes.
struct ReportingEvaluator<'a> {
    round: EvaluationRound<'a>,
}

#[async_trait]
impl PostEvaluator for ReportingEvaluator<'_> {
    async fn evaluate(&self, post: &ghostwriter::PostRecord) -> ghostwriter::Result<RoundReport> {
        let report = self.round.run(post).await?;
        report::print_round_report(&report);
        Ok(report)
    }
}

async fn run_evaluate(
    config: &Config,
    max_errors: Option<u32>,
    post_limit: Option<usize>,
    rounds: Option<u64>,
) -> Result<()> {
    let client = connect(config).await?;
    let posts = load_posts(config)?;
    let repo = open_repository(config);
    if repo.is_empty()? {
        return Err(Error::NoStylePrompts.into());
    }

    let settings = LoopSettings {
        max_consecutive_errors: max_errors.unwrap_or(config.evaluation.max_consecutive_errors),
        backoff: Duration::from_secs(config.evaluation.backoff_secs),
        post_limit: post_limit.or(config.evaluation.post_limit),
        max_rounds: rounds,
    };

    let evaluator = ReportingEvaluator {
        round: EvaluationRound::new(&client, &repo, &posts),
    };
    let summary = run_continuous(&evaluator, posts.clone(), &settings).await?;
    report::print_loop_summary(&summary);

    if summary.stop == StopReason::ErrorBudgetExhausted {
        bail!(
            "evaluation stopped after {} consecutive failed rounds",
            settings.max_consecutive_errors
        );
    }
    Ok(())
}

fn run_rankings(config: &Config) -> Result<()> {
    let repo = open_repository(config);
    let descriptions = repo.load()?;
    if descriptions.is_empty() {
        return Err(Error::NoStylePrompts.into());
    }
    report::print_rankings(&descriptions);
    Ok(())
}
