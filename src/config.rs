//! Configuration loading
//!
//! Everything has a default so the tool runs without a config file. Lookup
//! order: `--config <path>`, `./ghostwriter.toml`, then
//! `<user config dir>/ghostwriter/ghostwriter.toml`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "ghostwriter.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for relative paths. Defaults to the directory holding
    /// the config file, or the working directory without one.
    pub data_dir: Option<PathBuf>,
    pub model: ModelConfig,
    pub paths: PathsConfig,
    pub synthesis: SynthesisConfig,
    pub evaluation: EvaluationConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub name: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            name: "llama3".to_string(),
            timeout_secs: 300,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub posts: PathBuf,
    pub style_index: PathBuf,
    pub prompts_dir: PathBuf,
    pub exports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            posts: PathBuf::from("posts_database.json"),
            style_index: PathBuf::from("style_prompts.json"),
            prompts_dir: PathBuf::from("prompts"),
            exports_dir: PathBuf::from("wordpress_exports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub batch_size: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub max_consecutive_errors: u32,
    pub backoff_secs: u64,
    pub post_limit: Option<usize>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 3,
            backoff_secs: 10,
            post_limit: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub min_content_chars: usize,
    pub keyword_content_chars: usize,
    pub checkpoint_every: usize,
    pub skip_title_prefixes: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 50,
            keyword_content_chars: 4000,
            checkpoint_every: 25,
            skip_title_prefixes: vec!["X-post:".to_string()],
        }
    }
}

impl Config {
    fn base_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    pub fn posts_path(&self) -> PathBuf {
        self.resolve(&self.paths.posts)
    }

    pub fn style_index_path(&self) -> PathBuf {
        self.resolve(&self.paths.style_index)
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.resolve(&self.paths.prompts_dir)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.resolve(&self.paths.exports_dir)
    }

    fn validate(&self) -> Result<()> {
        if self.synthesis.batch_size == 0 {
            bail!("synthesis.batch_size must be >= 1");
        }
        if self.evaluation.max_consecutive_errors == 0 {
            bail!("evaluation.max_consecutive_errors must be >= 1");
        }
        if self.import.checkpoint_every == 0 {
            bail!("import.checkpoint_every must be >= 1");
        }
        if self.model.name.trim().is_empty() {
            bail!("model.name must not be empty");
        }
        Ok(())
    }
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    if config.data_dir.is_none() {
        config.data_dir = path.parent().map(Path::to_path_buf);
    } else if let Some(dir) = &config.data_dir {
        if dir.is_relative() {
            config.data_dir = path.parent().map(|parent| parent.join(dir));
        }
    }

    config.validate()?;
    Ok(config)
}

/// Config from an explicit path, or the first file found in the default
/// locations, or built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config(&local);
    }

    if let Some(user_dir) = dirs::config_dir() {
        let user = user_dir.join("ghostwriter").join(CONFIG_FILE_NAME);
        if user.exists() {
            return load_config(&user);
        }
    }

    let config = Config::default();
    config.validate()?;
    Ok(config)
}
