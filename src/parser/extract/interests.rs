use super::dedupe;
use crate::parser::blocks::{is_header_like, links, list_item, plain_text};
use crate::parser::sections::{locate, INTERESTS};

pub fn extract(document: &str) -> Vec<String> {
    locate(document, INTERESTS).map(parse_section).unwrap_or_default()
}

/// Link labels anywhere in the body, followed by every bulleted line.
pub fn parse_section(body: &str) -> Vec<String> {
    let labels = links(body)
        .into_iter()
        .map(|(label, _)| plain_text(&label));

    let bullets = body
        .lines()
        .filter_map(list_item)
        .filter(|item| !is_header_like(item))
        .map(plain_text);

    dedupe(labels.chain(bullets).filter(|s| !s.is_empty()).collect())
}
