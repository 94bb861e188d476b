//! Keyword relevance filter over the corpus
//!
//! Bag-of-words matching: a post is relevant when any content-bearing
//! query token appears in its title, or overlaps one of its keywords.
//! A query made only of stop words matches nothing, and generation then
//! proceeds without source material.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::types::PostRecord;

/// Common English function words plus generic command verbs
pub static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can't", "cannot", "could", "couldn't", "did", "didn't",
        "do", "does", "doesn't", "doing", "don't", "down", "during", "each", "few", "for",
        "from", "further", "had", "hadn't", "has", "hasn't", "have", "haven't", "having", "he",
        "he'd", "he'll", "he's", "her", "here", "here's", "hers", "herself", "him", "himself",
        "his", "how", "how's", "i", "i'd", "i'll", "i'm", "i've", "if", "in", "into", "is",
        "isn't", "it", "it's", "its", "itself", "let's", "me", "more", "most", "mustn't", "my",
        "myself", "no", "nor", "not", "of", "off", "on", "once", "only", "or", "other", "ought",
        "our", "ours", "ourselves", "out", "over", "own", "same", "shan't", "she", "she'd",
        "she'll", "she's", "should", "shouldn't", "so", "some", "such", "than", "that",
        "that's", "the", "their", "theirs", "them", "themselves", "then", "there", "there's",
        "these", "they", "they'd", "they'll", "they're", "they've", "this", "those", "through",
        "to", "too", "under", "until", "up", "very", "was", "wasn't", "we", "we'd", "we'll",
        "we're", "we've", "were", "weren't", "what", "what's", "when", "when's", "where",
        "where's", "which", "while", "who", "who's", "whom", "why", "why's", "with", "won't",
        "would", "wouldn't", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
        "yourself", "yourselves",
        // query verbs that say nothing about content
        "tell", "give", "show", "explain", "can", "write", "compose", "generate",
    ]
    .into_iter()
    .collect()
});

/// Lower-case, strip punctuation, split on whitespace, drop stop words.
pub fn query_keywords(query: &str) -> Vec<String> {
    let cleaned: String = query
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// True when `post` matches at least one of `keywords`.
pub fn is_relevant(post: &PostRecord, keywords: &[String]) -> bool {
    let title = post.title.to_lowercase();
    if keywords.iter().any(|kw| title.contains(kw.as_str())) {
        return true;
    }

    post.keywords.iter().any(|db_kw| {
        let db_kw = db_kw.to_lowercase();
        !db_kw.is_empty()
            && keywords
                .iter()
                .any(|kw| db_kw.contains(kw.as_str()) || kw.contains(db_kw.as_str()))
    })
}

/// Relevant posts for `query`, most recent first. Equal dates keep corpus
/// order.
pub fn select(posts: &[PostRecord], query: &str) -> Vec<PostRecord> {
    let keywords = query_keywords(query);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut relevant: Vec<PostRecord> = posts
        .iter()
        .filter(|post| is_relevant(post, &keywords))
        .cloned()
        .collect();

    // sort_by is stable
    relevant.sort_by(|a, b| b.date.cmp(&a.date));
    relevant
}
