//! Style description repository
//!
//! On disk: an index file holding an ordered array of
//! `{ "promptFile": ..., "score": ... }` entries, plus one text file per
//! entry in the prompts directory. Creation appends one entry; any score
//! change rewrites the whole index.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::write_atomic;
use crate::types::StyleDescription;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    prompt_file: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Clone)]
pub struct StyleRepository {
    index_path: PathBuf,
    prompts_dir: PathBuf,
}

impl StyleRepository {
    pub fn new(index_path: impl Into<PathBuf>, prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            prompts_dir: prompts_dir.into(),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    fn read_index(&self) -> Result<Vec<IndexEntry>> {
        match std::fs::read_to_string(&self.index_path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_index(&self, entries: &[IndexEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        write_atomic(&self.index_path, json.as_bytes())?;
        Ok(())
    }

    fn read_text(&self, prompt_file: &str) -> Result<String> {
        let path = self.prompts_dir.join(prompt_file);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::NotFound(format!("style prompt file {}", path.display()))
            }
            _ => e.into(),
        })
    }

    fn describe(&self, index: usize, entry: &IndexEntry) -> Result<StyleDescription> {
        Ok(StyleDescription {
            index,
            prompt_file: entry.prompt_file.clone(),
            text: self.read_text(&entry.prompt_file)?,
            fitness: entry.score,
        })
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_index()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every description with its text, in index order.
    pub fn load(&self) -> Result<Vec<StyleDescription>> {
        let entries = self.read_index()?;
        let descriptions = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| self.describe(i, entry))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = descriptions.len(), "Loaded style prompts");
        Ok(descriptions)
    }

    /// Index entries in order, without reading their texts. `text` is left
    /// empty; use [`StyleRepository::text_of`] per entry.
    pub fn entries(&self) -> Result<Vec<StyleDescription>> {
        let entries = self.read_index()?;
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| StyleDescription {
                index,
                prompt_file: entry.prompt_file,
                text: String::new(),
                fitness: entry.score,
            })
            .collect())
    }

    /// Prompt text behind one index entry.
    pub fn text_of(&self, description: &StyleDescription) -> Result<String> {
        self.read_text(&description.prompt_file)
    }

    /// The description at `index`.
    pub fn get(&self, index: usize) -> Result<StyleDescription> {
        let entries = self.read_index()?;
        let entry = entries.get(index).ok_or_else(|| {
            Error::NotFound(format!(
                "style prompt index {index} (repository holds {})",
                entries.len()
            ))
        })?;
        self.describe(index, entry)
    }

    /// Highest fitness; the first entry wins ties.
    pub fn best(&self) -> Result<StyleDescription> {
        let entries = self.read_index()?;
        let mut best: Option<usize> = None;
        for (i, entry) in entries.iter().enumerate() {
            if best.map_or(true, |b| entry.score > entries[b].score) {
                best = Some(i);
            }
        }
        let index = best.ok_or(Error::NoStylePrompts)?;
        self.describe(index, &entries[index])
    }

    /// Persist a new description with fitness 0. The text file is written
    /// before the index, so a crash never leaves a dangling entry.
    pub fn append(&self, text: &str) -> Result<StyleDescription> {
        std::fs::create_dir_all(&self.prompts_dir)?;

        let prompt_file = format!(
            "prompt-{}-{}.txt",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let path = self.prompts_dir.join(&prompt_file);
        std::fs::write(&path, text)?;
        info!("Saved prompt to {}", path.display());

        let mut entries = self.read_index()?;
        entries.push(IndexEntry {
            prompt_file: prompt_file.clone(),
            score: 0.0,
        });
        self.write_index(&entries)?;

        Ok(StyleDescription {
            index: entries.len() - 1,
            prompt_file,
            text: text.to_string(),
            fitness: 0.0,
        })
    }

    /// Rewrite every index entry from `descriptions`, in order.
    pub fn replace_all(&self, descriptions: &[StyleDescription]) -> Result<()> {
        let entries: Vec<IndexEntry> = descriptions
            .iter()
            .map(|d| IndexEntry {
                prompt_file: d.prompt_file.clone(),
                score: d.fitness,
            })
            .collect();
        self.write_index(&entries)
    }
}
