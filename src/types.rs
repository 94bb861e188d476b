//! Core records shared by the corpus, the style repository and the
//! evaluation loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical post by the author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Stable identifier (the export GUID)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub blog_title: String,
    pub date: DateTime<Utc>,
    /// Plain text body, HTML already stripped
    pub content: String,
    #[serde(default, rename = "ai_keywords")]
    pub keywords: Vec<String>,
}

impl PostRecord {
    /// Topic used to elicit a comparable sample during evaluation: the
    /// first three keywords, or the title when there are none.
    pub fn probe_topic(&self) -> String {
        if self.keywords.is_empty() {
            self.title.clone()
        } else {
            self.keywords
                .iter()
                .take(3)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

/// Projection of a post handed to the model as source material
#[derive(Debug, Clone, PartialEq)]
pub struct RelevantPost {
    pub title: String,
    pub date: DateTime<Utc>,
    pub content: String,
    pub keywords: Vec<String>,
}

impl From<&PostRecord> for RelevantPost {
    fn from(post: &PostRecord) -> Self {
        Self {
            title: post.title.clone(),
            date: post.date,
            content: post.content.clone(),
            keywords: post.keywords.clone(),
        }
    }
}

/// A candidate style prompt with its running fitness
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDescription {
    /// Position in the repository for the current load
    pub index: usize,
    /// File name (relative to the prompts directory) holding the text
    pub prompt_file: String,
    pub text: String,
    pub fitness: f64,
}

/// Which style description the generator should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleSelection {
    /// Highest fitness, first one wins ties
    #[default]
    Best,
    Index(usize),
}

impl From<Option<usize>> for StyleSelection {
    fn from(index: Option<usize>) -> Self {
        index.map_or(StyleSelection::Best, StyleSelection::Index)
    }
}

/// Likeness of one description's sample against the held-out post
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreEntry {
    pub index: usize,
    pub score: f64,
}

/// Fitness change applied to one description after a round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitnessAdjustment {
    pub index: usize,
    pub prompt_file: String,
    pub likeness: f64,
    pub delta: f64,
    pub old_fitness: f64,
    pub new_fitness: f64,
}

/// Outcome of one evaluation round
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub post_id: String,
    pub post_title: String,
    pub probe_topic: String,
    pub average: f64,
    /// Descriptions whose generation or scoring failed and were counted as 0.0
    pub failures: usize,
    pub adjustments: Vec<FitnessAdjustment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(keywords: &[&str]) -> PostRecord {
        PostRecord {
            id: "guid-1".into(),
            title: "Notes from the garden".into(),
            blog_title: "Field Notes".into(),
            date: "2023-04-01T10:00:00Z".parse().unwrap(),
            content: "Tomatoes again.".into(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_probe_topic_uses_first_three_keywords() {
        let p = post(&["tomatoes", "compost", "spring", "rain"]);
        assert_eq!(p.probe_topic(), "tomatoes, compost, spring");
    }

    #[test]
    fn test_probe_topic_falls_back_to_title() {
        assert_eq!(post(&[]).probe_topic(), "Notes from the garden");
    }

    #[test]
    fn test_post_record_reads_corpus_field_names() {
        let json = r#"{
            "id": "https://example.com/?p=12",
            "title": "Hello",
            "blog_title": "Blog",
            "date": "2021-06-01T08:30:00.000Z",
            "content": "Body",
            "ai_keywords": ["one", "two"]
        }"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.keywords, vec!["one", "two"]);
        assert_eq!(record.blog_title, "Blog");
    }

    #[test]
    fn test_style_selection_from_option() {
        assert_eq!(StyleSelection::from(None), StyleSelection::Best);
        assert_eq!(StyleSelection::from(Some(2)), StyleSelection::Index(2));
    }
}
