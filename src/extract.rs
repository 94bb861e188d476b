//! Lenient extraction of structured values from model replies
//!
//! Judges and keyword extractors are asked for bare values but routinely
//! wrap them in chatter. Accepted forms:
//!
//! ```text
//! score    := <chatter>? number <chatter>?      number := digits? "."? digits
//! keywords := "N/A"
//!           | prefix? (lead-up line "\n")? item (("," | "\n") item)*
//! prefix   := "Here are" | "These are" | "The keywords are" | "Sure, here are"
//!           | "Based on the text" | "I extracted" | "The following are" ... ":"
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d*\.?\d+").expect("valid regex"));

static CHATTER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:here are|these are|the keywords are|sure, here are|based on the text|i extracted|the following are)[^:\n]*:\s*",
    )
    .expect("valid regex")
});

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s*").expect("valid regex"));

const CHATTER_WORDS: &[&str] = &[
    "keywords",
    "keyphrases",
    "relevant",
    "important",
    "extracted",
    "phrases",
];

const MAX_KEYWORD_CHARS: usize = 100;

/// First decimal number in `reply`, clamped to `[0.0, 1.0]`.
pub fn extract_score(reply: &str) -> Result<f64> {
    let found = NUMBER
        .find(reply)
        .ok_or_else(|| Error::ParseFailure(reply.to_string()))?;
    let value: f64 = found
        .as_str()
        .parse()
        .map_err(|_| Error::ParseFailure(reply.to_string()))?;
    if !value.is_finite() {
        return Err(Error::ParseFailure(reply.to_string()));
    }
    Ok(value.clamp(0.0, 1.0))
}

/// Keyword list from a comma or newline separated reply.
pub fn extract_keywords(reply: &str) -> Vec<String> {
    let mut text = reply.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
        return Vec::new();
    }

    if let Some(m) = CHATTER_PREFIX.find(text) {
        text = text[m.end()..].trim();
    }

    // "Keywords for this post:\nfoo, bar" - drop the lead-up line
    if let Some((first, rest)) = text.split_once('\n') {
        if first.contains(':') && !first.contains(',') {
            text = rest.trim();
        }
    }

    if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
        return Vec::new();
    }

    text.split([',', '\n'])
        .map(|item| LIST_MARKER.replace(item.trim(), "").trim().to_string())
        .filter(|item| !item.is_empty() && item.chars().count() < MAX_KEYWORD_CHARS)
        .filter(|item| !is_chatter(item))
        .collect()
}

fn is_chatter(item: &str) -> bool {
    let lower = item.to_lowercase();
    item.split_whitespace().count() > 2 && CHATTER_WORDS.iter().any(|w| lower.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_score_accepted_forms() {
        assert_eq!(extract_score("0.83").unwrap(), 0.83);
        assert_eq!(extract_score("Score: 0.83").unwrap(), 0.83);
        assert_eq!(extract_score("0.83 out of 1.0").unwrap(), 0.83);
        assert_eq!(extract_score("  .5\n").unwrap(), 0.5);
    }

    #[test]
    fn test_extract_score_clamps_out_of_range() {
        assert_eq!(extract_score("7").unwrap(), 1.0);
    }

    #[test]
    fn test_extract_score_rejects_non_numeric() {
        let err = extract_score("The styles are quite similar.").unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
        assert!(extract_score("").is_err());
    }

    #[test]
    fn test_extract_keywords_plain_list() {
        assert_eq!(
            extract_keywords("gardening, compost , spring planting"),
            vec!["gardening", "compost", "spring planting"]
        );
    }

    #[test]
    fn test_extract_keywords_not_available() {
        assert!(extract_keywords("N/A").is_empty());
        assert!(extract_keywords("  n/a ").is_empty());
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn test_extract_keywords_strips_conversational_prefix() {
        assert_eq!(
            extract_keywords("Here are the keywords: remote work, hiring, culture"),
            vec!["remote work", "hiring", "culture"]
        );
        assert_eq!(
            extract_keywords("Sure, here are the 5 keyphrases:\nbudget\nforecast\nQ3"),
            vec!["budget", "forecast", "Q3"]
        );
    }

    #[test]
    fn test_extract_keywords_drops_lead_up_line_and_markers() {
        assert_eq!(
            extract_keywords("Keywords for this post:\n1. leadership\n2. feedback"),
            vec!["leadership", "feedback"]
        );
    }

    #[test]
    fn test_extract_keywords_filters_chatter_and_long_items() {
        let long = "x".repeat(120);
        let reply = format!("the most important keywords, design, {long}");
        assert_eq!(extract_keywords(&reply), vec!["design"]);
        // Short items mentioning a chatter word survive
        assert_eq!(extract_keywords("relevant data"), vec!["relevant data"]);
    }
}
