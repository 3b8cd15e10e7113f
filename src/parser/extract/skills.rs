use super::dedupe;
use crate::parser::blocks::{is_header_like, list_item, plain_text};
use crate::parser::sections::{locate, SKILLS};

pub fn extract(document: &str) -> Vec<String> {
    locate(document, SKILLS).map(parse_section).unwrap_or_default()
}

/// Bulleted or numbered items; a body without any falls back to comma and
/// newline separated values.
pub fn parse_section(body: &str) -> Vec<String> {
    let mut skills: Vec<String> = body
        .lines()
        .filter_map(list_item)
        .filter(|item| !is_header_like(item))
        .map(plain_text)
        .filter(|s| !s.is_empty())
        .collect();

    if skills.is_empty() {
        skills = body
            .split([',', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty() && !is_header_like(s))
            .map(plain_text)
            .filter(|s| !s.is_empty())
            .collect();
    }

    dedupe(skills)
}
