use tracing::debug;

use super::{at_linked, at_plain, first_match, AtCapture, Matcher};
use crate::parser::blocks::{split_entries, EntryMarker};
use crate::parser::sections::{locate, EXPERIENCE};

const TIERS: &[Matcher<AtCapture>] = &[at_linked, at_plain];

/// `"<title> at <company>"` for every recognizable experience entry.
/// Company URLs are not kept.
pub fn extract(document: &str) -> Vec<String> {
    let Some(body) = locate(document, EXPERIENCE) else {
        return Vec::new();
    };

    split_entries(body, EntryMarker::SubHeading)
        .iter()
        .filter_map(|block| {
            let entry = parse_entry(block);
            if entry.is_none() {
                debug!(entry = %block, "skipping experience entry without '<title> at <company>'");
            }
            entry
        })
        .collect()
}

pub fn parse_entry(block: &str) -> Option<String> {
    let cap = first_match(block, TIERS)?;
    Some(format!("{} at {}", cap.left, cap.right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linked_company() {
        let md = "## Experience\n- ### Engineer at [Acme](https://linkedin.com/company/acme)\n";
        assert_eq!(extract(md), vec!["Engineer at Acme"]);
    }

    #[test]
    fn plain_company_and_dates() {
        let md = "## Work Experience\n- ### Senior Engineer at Globex\n  Jan 2020 - Present\n- ### Intern at Initech (2018 - 2019)\n";
        assert_eq!(extract(md), vec!["Senior Engineer at Globex", "Intern at Initech"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let md = "## Experience\n- ### Engineer at Acme\n- ### Engineer at Acme\n";
        assert_eq!(extract(md).len(), 2);
    }

    #[test]
    fn unparsable_entry_is_skipped() {
        let md = "## Experience\n- ### Freelance\n- ### CTO at [Beta](https://beta.io)\n";
        assert_eq!(extract(md), vec!["CTO at Beta"]);
    }

    #[test]
    fn no_section() {
        assert!(extract("## Skills\n- Rust").is_empty());
    }
}
