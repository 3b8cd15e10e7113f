use std::sync::LazyLock;

use regex::Regex;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*\S)\s*$").unwrap());
static LIST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?:[-*+•]|\d+[.)])\s+(.*)$").unwrap());
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").unwrap());
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static SUBHEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]\s+)?#{3,6}(?:\s+(.*))?$").unwrap());
// Years and separators only, e.g. `2015 - 2019`, `(2020 – Present)`.
static BARE_DATES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\(?\s*\d{4}[\d\s\-–—/.,]*(?:present)?\s*\)?$").unwrap());
static BOLD_BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(\*\*.*)$").unwrap());
// `**Date:**` or `**Date**:` at the start of a bullet is a field label, not a new entry.
static BOLD_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*[^*]*(?::\s*\*\*|\*\*\s*:)").unwrap());

/// Line-start token that opens a new entry inside a section body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMarker {
    /// `- ### Title`, `### Title` (heading level 3 or deeper, bullet optional)
    SubHeading,
    /// `- **Title**`, unless the bold run is a `Label:`
    BoldBullet,
    SubHeadingOrBold,
}

impl EntryMarker {
    /// If `line` opens a new entry, return its text with the marker removed.
    pub fn strip<'a>(&self, line: &'a str) -> Option<&'a str> {
        match self {
            EntryMarker::SubHeading => SUBHEADING_RE
                .captures(line)
                .map(|c| c.get(1).map_or("", |m| m.as_str()).trim()),
            EntryMarker::BoldBullet => {
                let caps = BOLD_BULLET_RE.captures(line)?;
                let rest = caps.get(1)?.as_str().trim();
                if BOLD_LABEL_RE.is_match(rest) {
                    None
                } else {
                    Some(rest)
                }
            }
            EntryMarker::SubHeadingOrBold => EntryMarker::SubHeading
                .strip(line)
                .or_else(|| EntryMarker::BoldBullet.strip(line)),
        }
    }
}

/// Partition a section body into entry blocks at `marker` boundaries.
///
/// Text before the first marker is discarded, so a body without any marker
/// yields no entries. Each block is its non-empty lines, trimmed, with the
/// marker removed from the first one.
pub fn split_entries(body: &str, marker: EntryMarker) -> Vec<String> {
    let mut entries: Vec<Vec<&str>> = Vec::new();

    for line in body.lines() {
        if let Some(first) = marker.strip(line) {
            entries.push(vec![first]);
            continue;
        }
        if let Some(current) = entries.last_mut() {
            current.push(line.trim());
        }
    }

    entries
        .into_iter()
        .map(|lines| {
            lines
                .into_iter()
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|block| !block.trim().is_empty())
        .collect()
}

/// `(level, text)` for a markdown heading line.
pub fn heading(line: &str) -> Option<(usize, &str)> {
    let caps = HEADING_RE.captures(line.trim())?;
    let level = caps.get(1)?.as_str().len();
    let text = caps.get(2)?.as_str();
    Some((level, text))
}

/// Text of a bulleted (`-`, `*`, `+`, `•`) or numbered (`1.`, `1)`) line.
pub fn list_item(line: &str) -> Option<&str> {
    LIST_RE.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str().trim())
}

/// True for bullet lines, numbered items (`1.`, `2)`) and bare date lines.
pub fn is_marker_line(line: &str) -> bool {
    let t = line.trim();
    LIST_RE.is_match(t)
        || (t.starts_with(['-', '*', '+', '•']) && !t.starts_with("**"))
        || BARE_DATES_RE.is_match(t)
}

pub fn is_header_like(text: &str) -> bool {
    text.trim_start().starts_with('#')
}

pub fn strip_bold(s: &str) -> String {
    let replaced = BOLD_RE.replace_all(s, |caps: &regex::Captures| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map_or(String::new(), |m| m.as_str().to_string())
    });
    replaced.replace("**", "").trim().to_string()
}

/// Links reduced to their labels, bold removed.
pub fn plain_text(s: &str) -> String {
    strip_bold(&LINK_RE.replace_all(s, "$1"))
}

/// Every `(label, url)` pair in `s`, in order.
pub fn links(s: &str) -> Vec<(String, String)> {
    LINK_RE
        .captures_iter(s)
        .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()))
        .collect()
}

/// Label of a link that opens `line`, e.g. `[Acme](https://…) rest`.
pub fn leading_link_label(line: &str) -> Option<&str> {
    let caps = LINK_RE.captures(line.trim_start())?;
    let whole = caps.get(0)?;
    if whole.start() != 0 {
        return None;
    }
    caps.get(1).map(|m| m.as_str().trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sub_headings() {
        let body = "intro text\n- ### Engineer at Acme\n  2019 - 2021\n- ### Intern at Beta\n";
        let entries = split_entries(body, EntryMarker::SubHeading);
        assert_eq!(entries, vec!["Engineer at Acme\n2019 - 2021", "Intern at Beta"]);
    }

    #[test]
    fn plain_bullets_are_continuation() {
        let body = "### [MIT](https://mit.edu)\n- Bachelor's, Physics\n- 2010 - 2014";
        let entries = split_entries(body, EntryMarker::SubHeading);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("- 2010 - 2014"));
    }

    #[test]
    fn no_markers_no_entries() {
        let body = "Just a paragraph.\n- a bullet\n- another";
        assert!(split_entries(body, EntryMarker::SubHeading).is_empty());
        assert!(split_entries("", EntryMarker::SubHeadingOrBold).is_empty());
    }

    #[test]
    fn bold_label_does_not_open_entry() {
        let body = "- **Tracer**\n- **Date:** 2020\n- **Crawler**\n- **For**: Acme";
        let entries = split_entries(body, EntryMarker::BoldBullet);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], "**Tracer**\n- **Date:** 2020");
        assert_eq!(entries[1], "**Crawler**\n- **For**: Acme");
    }

    #[test]
    fn either_marker() {
        let body = "- ### Alpha\n- **Beta**\nnotes";
        let entries = split_entries(body, EntryMarker::SubHeadingOrBold);
        assert_eq!(entries, vec!["Alpha", "**Beta**\nnotes"]);
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading("## Skills"), Some((2, "Skills")));
        assert_eq!(heading("###   Languages  "), Some((3, "Languages")));
        assert_eq!(heading("#hashtag"), None);
        assert_eq!(heading("- ## not a heading"), None);
    }

    #[test]
    fn list_items() {
        assert_eq!(list_item("- Python"), Some("Python"));
        assert_eq!(list_item("  * **Go**"), Some("**Go**"));
        assert_eq!(list_item("3. Rust"), Some("Rust"));
        assert_eq!(list_item("**Bold** line"), None);
        assert_eq!(list_item("plain"), None);
    }

    #[test]
    fn marker_lines() {
        assert!(is_marker_line("- detail"));
        assert!(is_marker_line("2015 - 2019"));
        assert!(is_marker_line("1. first"));
        assert!(!is_marker_line("**Bachelor of Arts**"));
        assert!(!is_marker_line("Master of Science, Physics"));
        assert!(is_marker_line("2) second"));
        assert!(is_marker_line("(2020 – Present)"));
        assert!(is_marker_line("2019"));
        assert!(!is_marker_line("3x faster than X"));
        assert!(!is_marker_line("2-year Diploma, Design"));
        assert!(!is_marker_line("3D renderer"));
    }

    #[test]
    fn text_cleanup() {
        assert_eq!(strip_bold("**Rust** and __Go__"), "Rust and Go");
        assert_eq!(strip_bold("dangling **"), "dangling");
        assert_eq!(plain_text("Lead at **[Acme](https://acme.io)**"), "Lead at Acme");
        assert_eq!(leading_link_label("[Tracer](https://x.dev) tool"), Some("Tracer"));
        assert_eq!(leading_link_label("see [Tracer](https://x.dev)"), None);
    }
}
