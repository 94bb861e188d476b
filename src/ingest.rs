//! Corpus ingestion from WordPress exports
//!
//! Resumable: posts whose GUID is already stored are skipped, and progress
//! is checkpointed every few new posts and after each export file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ImportConfig;
use crate::corpus::CorpusStore;
use crate::error::Result;
use crate::extract::extract_keywords;
use crate::llm::{ChatMessage, LanguageModel};
use crate::types::PostRecord;
use crate::wxr::{html_to_text, parse_export, ExportItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files: usize,
    pub imported: usize,
    pub already_present: usize,
    pub filtered: usize,
    pub without_keywords: usize,
    pub total_posts: usize,
}

/// Every `*.xml` file directly inside `dir`, sorted by name.
pub fn find_exports(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        })
        .collect();
    files.sort();
    files
}

pub struct Importer<'a> {
    model: &'a dyn LanguageModel,
    store: &'a CorpusStore,
    settings: &'a ImportConfig,
}

impl<'a> Importer<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        store: &'a CorpusStore,
        settings: &'a ImportConfig,
    ) -> Self {
        Self {
            model,
            store,
            settings,
        }
    }

    /// Keywords for `content`; short content and model failures yield none.
    pub async fn keywords_for(&self, content: &str) -> Vec<String> {
        if content.trim().chars().count() < self.settings.min_content_chars {
            return Vec::new();
        }
        let excerpt: String = content
            .chars()
            .take(self.settings.keyword_content_chars)
            .collect();
        let prompt = format!(
            "Analyze the following blog post content. Identify and list the 5-7 most important and \
             relevant keywords or keyphrases. Your response MUST be a comma-separated list of these \
             keywords/keyphrases ONLY. Do not include any introductory phrases, explanations, \
             numbering, bullet points, or any text other than the keywords themselves. If no \
             relevant keywords can be found, or the text is too short/generic, output the exact \
             string 'N/A'.\n\nCONTENT:\n{excerpt}"
        );

        match self.model.chat(&[ChatMessage::user(prompt)]).await {
            Ok(reply) => extract_keywords(&reply),
            Err(e) => {
                warn!("Keyword extraction failed: {e}");
                Vec::new()
            }
        }
    }

    fn is_skipped_title(&self, title: &str) -> bool {
        let title = title.trim();
        self.settings
            .skip_title_prefixes
            .iter()
            .any(|prefix| title.starts_with(prefix.as_str()))
    }

    pub async fn import_dir(&self, dir: &Path) -> Result<ImportSummary> {
        let files = find_exports(dir);
        if files.is_empty() {
            warn!("No XML files found in {}", dir.display());
        }
        self.import_files(&files).await
    }

    pub async fn import_files(&self, files: &[PathBuf]) -> Result<ImportSummary> {
        let mut posts = self.store.load_or_empty()?;
        let mut seen: HashSet<String> = posts.iter().map(|p| p.id.clone()).collect();
        info!(
            "Loaded {} posts from existing database, {} GUIDs to skip",
            posts.len(),
            seen.len()
        );

        let mut summary = ImportSummary::default();
        for file in files {
            info!("Processing XML file: {}", file.display());
            let xml = std::fs::read_to_string(file)?;
            let channel = parse_export(&xml)?;

            for item in &channel.items {
                if let Some(post) = self
                    .import_item(item, &channel.blog_title, &seen, &mut summary)
                    .await
                {
                    seen.insert(post.id.clone());
                    posts.push(post);
                    summary.imported += 1;

                    if summary.imported % self.settings.checkpoint_every.max(1) == 0 {
                        self.store.save(&mut posts)?;
                        info!("Progress saved, {} posts in database", posts.len());
                    }
                }
            }

            summary.files += 1;
            self.store.save(&mut posts)?;
            info!("Finished {}, progress saved", file.display());
        }

        summary.total_posts = posts.len();
        Ok(summary)
    }

    async fn import_item(
        &self,
        item: &ExportItem,
        blog_title: &str,
        seen: &HashSet<String>,
        summary: &mut ImportSummary,
    ) -> Option<PostRecord> {
        let guid = item.guid.trim();
        if guid.is_empty() {
            warn!("Post \"{}\" has no GUID, skipping", item.title);
            summary.filtered += 1;
            return None;
        }
        if seen.contains(guid) {
            summary.already_present += 1;
            return None;
        }
        if self.is_skipped_title(&item.title) {
            info!("Skipping post by title prefix: {}", item.title);
            summary.filtered += 1;
            return None;
        }
        if !item.is_published_post() {
            debug!(guid, "Not a published post");
            summary.filtered += 1;
            return None;
        }
        let Some(date) = item.published_at() else {
            warn!(guid, "Unreadable pubDate {:?}, skipping", item.pub_date);
            summary.filtered += 1;
            return None;
        };

        let content = html_to_text(&item.content_html);
        if content.is_empty() {
            info!("No content found in \"{}\", skipping", item.title);
            summary.filtered += 1;
            return None;
        }

        let keywords = self.keywords_for(&content).await;
        if keywords.is_empty() {
            info!("No keywords extracted for \"{}\", skipping", item.title);
            summary.without_keywords += 1;
            return None;
        }
        info!("Imported \"{}\" keywords: [{}]", item.title, keywords.join(", "));

        Some(PostRecord {
            id: guid.to_string(),
            title: item.title.clone(),
            blog_title: blog_title.to_string(),
            date,
            content,
            keywords,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use tempfile::tempdir;

    fn item_xml(guid: &str, title: &str, day: u32, body: &str, status: &str) -> String {
        format!(
            r#"<item>
    <title>{title}</title>
    <pubDate>{day:02} Mar 2022 09:00:00 +0000</pubDate>
    <guid isPermaLink="false">{guid}</guid>
    <content:encoded><![CDATA[{body}]]></content:encoded>
    <wp:post_type>post</wp:post_type>
    <wp:status>{status}</wp:status>
</item>"#
        )
    }

    fn export(items: &[String]) -> String {
        format!(
            r#"<?xml version="1.0"?>
<rss xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:wp="http://wordpress.org/export/1.2/">
<channel><title>My Blog</title>
{}
</channel></rss>"#,
            items.join("\n")
        )
    }

    const LONG_BODY: &str = "<p>This is a long enough post body about gardening and compost heaps in spring.</p>";

    #[tokio::test]
    async fn test_imports_published_posts_with_keywords() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("blog.xml"),
            export(&[
                item_xml("g1", "Compost", 1, LONG_BODY, "publish"),
                item_xml("g2", "Draft", 2, LONG_BODY, "draft"),
                item_xml("g3", "X-post: elsewhere", 3, LONG_BODY, "publish"),
                item_xml("g4", "Tiny", 4, "<p>short</p>", "publish"),
            ]),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = CorpusStore::new(dir.path().join("posts_database.json"));
        let settings = ImportConfig::default();
        let model = ScriptedModel::always("Here are the keywords: compost, gardening, spring");
        let importer = Importer::new(&model, &store, &settings);

        let summary = importer.import_dir(dir.path()).await.unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.filtered, 2);
        assert_eq!(summary.without_keywords, 1);
        // short content never reaches the model
        assert_eq!(model.call_count(), 1);

        let stored = store.load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "g1");
        assert_eq!(stored[0].blog_title, "My Blog");
        assert_eq!(stored[0].keywords, vec!["compost", "gardening", "spring"]);
        assert!(!stored[0].content.contains('<'));
    }

    #[tokio::test]
    async fn test_second_run_skips_known_guids() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("blog.xml"),
            export(&[
                item_xml("g1", "One", 1, LONG_BODY, "publish"),
                item_xml("g2", "Two", 2, LONG_BODY, "publish"),
            ]),
        )
        .unwrap();

        let store = CorpusStore::new(dir.path().join("posts_database.json"));
        let settings = ImportConfig::default();
        let model = ScriptedModel::always("alpha, beta");
        let importer = Importer::new(&model, &store, &settings);

        importer.import_dir(dir.path()).await.unwrap();
        let again = importer.import_dir(dir.path()).await.unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.already_present, 2);
        assert_eq!(model.call_count(), 2);

        let stored = store.load().unwrap();
        assert_eq!(stored.len(), 2);
        // newest first
        assert_eq!(stored[0].id, "g2");
    }

    #[tokio::test]
    async fn test_model_failure_skips_post_without_aborting() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("blog.xml"),
            export(&[
                item_xml("g1", "One", 1, LONG_BODY, "publish"),
                item_xml("g2", "Two", 2, LONG_BODY, "publish"),
            ]),
        )
        .unwrap();

        let store = CorpusStore::new(dir.path().join("posts_database.json"));
        let settings = ImportConfig::default();
        let model = ScriptedModel::new().refuse().reply("alpha, beta");
        let importer = Importer::new(&model, &store, &settings);

        let summary = importer.import_dir(dir.path()).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.without_keywords, 1);
        assert_eq!(store.load().unwrap()[0].id, "g2");
    }

    #[tokio::test]
    async fn test_keyword_excerpt_is_truncated() {
        let dir = tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("posts_database.json"));
        let settings = ImportConfig {
            keyword_content_chars: 60,
            ..ImportConfig::default()
        };
        let model = ScriptedModel::always("N/A");
        let importer = Importer::new(&model, &store, &settings);

        let body = "word ".repeat(200);
        assert!(importer.keywords_for(&body).await.is_empty());

        let prompt = &model.calls()[0][0].content;
        let excerpt = prompt.split("CONTENT:\n").nth(1).unwrap();
        assert_eq!(excerpt.chars().count(), 60);
    }

    #[test]
    fn test_find_exports_filters_by_extension() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.XML"), "").unwrap();
        std::fs::write(dir.path().join("a.xml"), "").unwrap();
        std::fs::write(dir.path().join("c.json"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d.xml"), "").unwrap();

        let names: Vec<String> = find_exports(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.xml", "b.XML"]);
    }
}
