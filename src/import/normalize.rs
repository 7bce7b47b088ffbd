use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::catalog::{MediaFormat, MediaType, Tag};

/// Keyword variants per tag, scanned in declaration order.
const TAG_KEYWORDS: &[(Tag, &[&str])] = &[
    (Tag::Vinyl, &["vinyl"]),
    (Tag::Mix, &["mix"]),
    (Tag::Broadcast, &["broadcast"]),
    (Tag::Test, &["test"]),
    (Tag::Live, &["live"]),
    (Tag::Special, &["special"]),
    (Tag::Revisited, &["revisited", "revised"]),
    (Tag::Collaboration, &["w/", "with", "feat", "featuring"]),
];

/// Collapse whitespace runs (line breaks included) to single spaces and trim.
pub fn clean_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `M/D/YYYY` to `YYYY-MM-DD`. Anything else comes back unchanged.
pub fn normalize_date(raw: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").unwrap());

    let trimmed = raw.trim();
    if !re.is_match(trimmed) {
        return raw.to_string();
    }
    match NaiveDate::parse_from_str(trimmed, "%m/%d/%Y") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Only `.mp4` is recognised; everything else is treated as an mp3.
pub fn infer_media(title: &str) -> (MediaType, MediaFormat) {
    if title.to_lowercase().contains(".mp4") {
        (MediaType::Video, MediaFormat::Mp4)
    } else {
        (MediaType::Audio, MediaFormat::Mp3)
    }
}

pub fn extract_tags(title: &str) -> Vec<Tag> {
    let lower = title.to_lowercase();
    TAG_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(tag, _)| *tag)
        .collect()
}
