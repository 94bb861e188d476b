//! Corpus store - the author's past posts as a flat JSON array
//!
//! Read-only for the generation and evaluation pipeline; only the importer
//! writes it.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::write_atomic;
use crate::types::PostRecord;

#[derive(Debug, Clone)]
pub struct CorpusStore {
    path: PathBuf,
}

impl CorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every post. A missing or unparsable file is `StoreUnavailable`.
    pub fn load(&self) -> Result<Vec<PostRecord>> {
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::StoreUnavailable(format!(
                "{}: {e} - run the `import` tool first",
                self.path.display()
            ))
        })?;

        let posts: Vec<PostRecord> = serde_json::from_str(&data)
            .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", self.path.display())))?;

        let usable = posts.iter().filter(|p| !p.content.trim().is_empty()).count();
        if usable < posts.len() {
            warn!(
                skipped = posts.len() - usable,
                "Ignoring posts with empty content"
            );
        }
        debug!(count = usable, path = %self.path.display(), "Loaded posts");

        Ok(posts
            .into_iter()
            .filter(|p| !p.content.trim().is_empty())
            .collect())
    }

    /// Load, treating a missing file as an empty corpus. Used by the
    /// importer to resume.
    pub fn load_or_empty(&self) -> Result<Vec<PostRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        self.load()
    }

    /// Replace the stored corpus, newest post first.
    pub fn save(&self, posts: &mut [PostRecord]) -> Result<()> {
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        let json = serde_json::to_string_pretty(posts)?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn post(id: &str, date: &str, content: &str) -> PostRecord {
        PostRecord {
            id: id.into(),
            title: format!("Title {id}"),
            blog_title: "Blog".into(),
            date: date.parse().unwrap(),
            content: content.into(),
            keywords: vec!["kw".into()],
        }
    }

    #[test]
    fn test_missing_file_is_store_unavailable() {
        let dir = tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("posts_database.json"));
        assert!(matches!(store.load(), Err(Error::StoreUnavailable(_))));
        assert!(store.load_or_empty().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_store_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posts_database.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            CorpusStore::new(path).load(),
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_save_sorts_newest_first_and_load_skips_empty_content() {
        let dir = tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("posts_database.json"));
        let mut posts = vec![
            post("old", "2019-01-01T00:00:00Z", "first"),
            post("new", "2024-01-01T00:00:00Z", "second"),
            post("blank", "2022-01-01T00:00:00Z", "   "),
        ];
        store.save(&mut posts).unwrap();

        let loaded = store.load().unwrap();
        let ids: Vec<&str> = loaded.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }
}
