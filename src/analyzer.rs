use crate::html::{self, heading_level, html_element_name};
use serde::Serialize;

const WORDS_PER_MINUTE: usize = 200;

/// Word and element statistics of a rendered post body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub word_count: usize,
    pub reading_time_minutes: u32,
    pub heading_count: usize,
    pub image_count: usize,
    pub link_count: usize,
}

/// Analyze (already sanitized) HTML.
pub fn analyze(html: &str) -> ContentMetadata {
    if html.trim().is_empty() {
        return ContentMetadata::default();
    }

    let root = html::parse(html);
    let word_count = html::text_content(&root).split_whitespace().count();

    let mut metadata = ContentMetadata {
        word_count,
        reading_time_minutes: reading_time(word_count),
        ..ContentMetadata::default()
    };

    html::walk(&root, |node| {
        match html_element_name(node) {
            Some("img") => metadata.image_count += 1,
            Some("a") => metadata.link_count += 1,
            Some(tag) if heading_level(tag).is_some() => metadata.heading_count += 1,
            _ => {}
        }
        true
    });

    metadata
}

/// Minutes to read `words` words: zero for an empty body, otherwise at least one.
pub fn reading_time(words: usize) -> u32 {
    let minutes = words.div_ceil(WORDS_PER_MINUTE);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Plain-text excerpt of `html`, cut at a word boundary within `max_chars`
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = html::text_content(&html::parse(html));
    if text.chars().count() <= max_chars {
        return text;
    }

    let mut cut = String::new();
    let mut cut_chars = 0;
    for word in text.split(' ') {
        let separator = usize::from(!cut.is_empty());
        let word_chars = word.chars().count();
        if cut_chars + separator + word_chars > max_chars {
            break;
        }
        if separator == 1 {
            cut.push(' ');
        }
        cut.push_str(word);
        cut_chars += separator + word_chars;
    }

    // A single word longer than the limit still yields something
    if cut.is_empty() {
        cut = text.chars().take(max_chars).collect();
    }

    cut.push_str("...");
    cut
}
