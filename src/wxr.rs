//! WordPress export (WXR) reading
//!
//! A WXR file is RSS 2.0 with `wp:` and `content:` extensions. Only the
//! fields the corpus needs are collected; everything else is skipped.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use tracing::warn;

use crate::error::{Error, Result};

pub const UNKNOWN_BLOG_TITLE: &str = "Unknown Blog Title";

/// One `<item>` from an export, fields as written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportItem {
    pub title: String,
    pub guid: String,
    pub pub_date: String,
    pub content_html: String,
    pub post_type: String,
    pub status: String,
}

impl ExportItem {
    /// Published posts with a body and a date; pages, drafts and
    /// attachments are excluded.
    pub fn is_published_post(&self) -> bool {
        self.post_type == "post"
            && self.status == "publish"
            && !self.content_html.trim().is_empty()
            && !self.pub_date.trim().is_empty()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc2822(self.pub_date.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportChannel {
    pub blog_title: String,
    pub items: Vec<ExportItem>,
}

fn assign(item: &mut ExportItem, field: &str, value: String) {
    match field {
        "title" => item.title = value,
        "guid" => item.guid = value,
        "pubDate" => item.pub_date = value,
        "content:encoded" => item.content_html = value,
        "wp:post_type" => item.post_type = value,
        "wp:status" => item.status = value,
        _ => {}
    }
}

pub fn parse_export(xml: &str) -> Result<ExportChannel> {
    let mut reader = Reader::from_str(xml);
    let mut channel = ExportChannel::default();
    let mut path: Vec<String> = Vec::new();
    let mut current: Option<ExportItem> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    current = Some(ExportItem::default());
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(s) => text.push_str(&s),
                // entities such as &nbsp; are not XML; keep them for the HTML pass
                Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
            },
            Ok(Event::CData(c)) => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(_)) => {
                let Some(name) = path.pop() else {
                    continue;
                };
                let parent = path.last().map(String::as_str);
                let value = std::mem::take(&mut text).trim().to_string();

                match (parent, name.as_str()) {
                    (_, "item") => {
                        if let Some(item) = current.take() {
                            channel.items.push(item);
                        }
                    }
                    (Some("item"), field) => {
                        if let Some(item) = current.as_mut() {
                            assign(item, field, value);
                        }
                    }
                    (Some("channel"), "title") => channel.blog_title = value,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::ParseFailure(format!(
                    "export XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    if channel.blog_title.is_empty() {
        channel.blog_title = UNKNOWN_BLOG_TITLE.to_string();
    }
    Ok(channel)
}

/// Wide enough that paragraphs are never wrapped mid-sentence
const WRAP_WIDTH: usize = 10_000;

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("valid regex")
});
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid regex"));
static LINK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?a\b[^>]*>").expect("valid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Plain text from post HTML. Link text is kept without its target, images
/// are dropped, block elements become line breaks.
pub fn html_to_text(html: &str) -> String {
    let html = SCRIPT_OR_STYLE.replace_all(html, "");
    let html = IMAGE.replace_all(&html, "");
    let html = LINK_TAG.replace_all(&html, "");

    let text = match html2text::from_read(html.as_bytes(), WRAP_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not convert post HTML to text: {e}");
            return String::new();
        }
    };
    let text = SPACES.replace_all(&text, " ");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    BLANK_LINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}
