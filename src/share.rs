use crate::slug::encode_component;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Ready-made share URLs for a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLinks {
    pub twitter: String,
    pub linkedin: String,
    pub facebook: String,
    pub whatsapp: String,
    pub copy: String,
}

pub fn share_links(title: &str, text: &str, url: &str) -> ShareLinks {
    let message = if text.trim().is_empty() {
        title.to_string()
    } else {
        format!("{} - {}", title, text.trim())
    };
    let encoded_url = encode_component(url);

    ShareLinks {
        twitter: format!(
            "https://twitter.com/intent/tweet?text={}&url={}",
            encode_component(&message),
            encoded_url
        ),
        linkedin: format!(
            "https://www.linkedin.com/sharing/share-offsite/?url={}",
            encoded_url
        ),
        facebook: format!("https://www.facebook.com/sharer/sharer.php?u={}", encoded_url),
        whatsapp: format!(
            "https://wa.me/?text={}",
            encode_component(&format!("{} {}", message, url))
        ),
        copy: url.to_string(),
    }
}

/// Human-friendly age of `then` as seen at `now`, e.g. "5 minutes ago".
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return "Just now".to_string();
    }

    let (count, unit) = match seconds {
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 7 * 86_400 => (s / 86_400, "day"),
        s if s < 30 * 86_400 => (s / (7 * 86_400), "week"),
        s if s < 365 * 86_400 => (s / (30 * 86_400), "month"),
        s => (s / (365 * 86_400), "year"),
    };

    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}
