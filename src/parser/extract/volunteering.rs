use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{at_linked, at_plain, date_range, first_match, label_regex, labeled_value, AtCapture, Matcher};
use crate::parser::blocks::{split_entries, EntryMarker};
use crate::parser::sections::{locate, VOLUNTEERING};
use crate::profile::VolunteerEntry;

static CAUSE_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(&["Cause", "Focus"]));

const TIERS: &[Matcher<AtCapture>] = &[at_linked, at_plain];

pub fn extract(document: &str) -> Vec<VolunteerEntry> {
    let Some(body) = locate(document, VOLUNTEERING) else {
        return Vec::new();
    };

    split_entries(body, EntryMarker::SubHeading)
        .iter()
        .filter_map(|block| {
            let entry = parse_entry(block);
            if entry.is_none() {
                debug!(entry = %block, "dropping volunteering entry without role and organization");
            }
            entry
        })
        .collect()
}

/// Like experience, but the organization link is kept when present.
pub fn parse_entry(block: &str) -> Option<VolunteerEntry> {
    let cap = first_match(block, TIERS)?;
    Some(VolunteerEntry {
        role: cap.left,
        organization: cap.right,
        cause: labeled_value(block, &CAUSE_RE),
        date_range: date_range(block),
        organization_url: cap.url,
    })
}
