//! Import posts from WordPress exports into the corpus
//!
//! Usage: cargo run --bin import -- [--config ghostwriter.toml]
//!
//! Reads every `*.xml` export in the configured exports directory, extracts
//! keywords with the language model and merges new posts into the corpus.
//! Safe to re-run: posts already in the corpus are skipped by GUID.

use anyhow::{Context, Result};
use clap::Parser;
use ghostwriter::ingest::Importer;
use ghostwriter::{resolve_config, CorpusStore, OllamaClient};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "import", version, about = "Import WordPress exports into the post corpus")]
struct Args {
    /// Path to a TOML config file. Defaults to ./ghostwriter.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(args.config.as_deref())?;

    let client = OllamaClient::new(
        &config.model.base_url,
        &config.model.name,
        config.model.timeout(),
    )
    .context("Failed to build Ollama client")?;
    if let Err(e) = client.health_check().await {
        warn!("Ollama health check failed: {e}. Keyword extraction will skip every post.");
    }

    let exports_dir = config.exports_dir();
    let store = CorpusStore::new(config.posts_path());
    println!("Importing exports from {}", exports_dir.display());
    println!("Writing corpus to {}", store.path().display());

    let importer = Importer::new(&client, &store, &config.import);
    let summary = importer
        .import_dir(&exports_dir)
        .await
        .with_context(|| format!("Import from {} failed", exports_dir.display()))?;

    println!("\nImport complete:");
    println!("   Files processed: {}", summary.files);
    println!("   New posts: {}", summary.imported);
    println!("   Already present: {}", summary.already_present);
    println!("   Filtered out: {}", summary.filtered);
    println!("   No keywords: {}", summary.without_keywords);
    println!("   Total posts in corpus: {}", summary.total_posts);

    Ok(())
}
