use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{date_range, label_regex, labeled_value, tidy, without_date_range};
use crate::parser::blocks::{is_marker_line, leading_link_label, plain_text, split_entries, strip_bold, EntryMarker};
use crate::parser::sections::{locate, PROJECTS};
use crate::profile::ProjectEntry;

static DATE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(&["Date", "Duration"]));
static ASSOCIATED_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(&["Associated with", "At", "For"]));
static ANY_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| label_regex(&["Date", "Duration", "Associated with", "At", "For"]));

pub fn extract(document: &str) -> Vec<ProjectEntry> {
    let Some(body) = locate(document, PROJECTS) else {
        return Vec::new();
    };

    split_entries(body, EntryMarker::SubHeadingOrBold)
        .iter()
        .filter_map(|block| {
            let entry = parse_entry(block);
            if entry.is_none() {
                debug!(entry = %block, "dropping project entry without a name");
            }
            entry
        })
        .collect()
}

pub fn parse_entry(block: &str) -> Option<ProjectEntry> {
    let lines: Vec<&str> = block.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let (name_idx, name) = project_name(&lines)?;

    let description = lines[name_idx + 1..]
        .iter()
        .find(|l| !is_marker_line(l) && !ANY_LABEL_RE.is_match(l))
        .map(|l| plain_text(l))
        .filter(|d| !d.is_empty());

    Some(ProjectEntry {
        name,
        description,
        date_range: date_range(block).or_else(|| labeled_value(block, &DATE_LABEL_RE)),
        associated_with: labeled_value(block, &ASSOCIATED_RE),
    })
}

/// Index of the line the name came from, and the cleaned name.
///
/// The first line that is not a link names the project; a leading link label
/// is used only when every line is a link or a label.
fn project_name(lines: &[&str]) -> Option<(usize, String)> {
    let plain = lines
        .iter()
        .enumerate()
        .map(|(i, l)| (i, strip_bold(l)))
        .filter(|(_, l)| !l.starts_with('['))
        .find_map(|(i, l)| clean_name(&l).map(|n| (i, n)));
    if plain.is_some() {
        return plain;
    }
    let first = strip_bold(lines.first()?);
    leading_link_label(&first).and_then(clean_name).map(|n| (0, n))
}

fn clean_name(line: &str) -> Option<String> {
    if ANY_LABEL_RE.is_match(line) {
        return None;
    }
    let name = tidy(&plain_text(&without_date_range(line)));
    (!name.is_empty()).then_some(name)
}
