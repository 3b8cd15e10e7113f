use super::blocks::heading;

pub const ABOUT: &[&str] = &["About me", "About", "Summary"];
pub const EXPERIENCE: &[&str] = &["Experience", "Work Experience", "Employment", "Employment History"];
pub const EDUCATION: &[&str] = &["Education", "Educational Background"];
pub const PROJECTS: &[&str] = &["Projects", "Personal Projects", "Side Projects"];
pub const VOLUNTEERING: &[&str] = &[
    "Volunteering",
    "Volunteer",
    "Volunteering Experience",
    "Volunteer Experience",
];
pub const SKILLS: &[&str] = &["Skills", "Top Skills", "Skills & Endorsements"];
pub const INTERESTS: &[&str] = &["Interests", "Following", "Groups", "Companies Followed"];

/// Deepest heading level that opens (and closes) a section.
const SECTION_LEVEL: usize = 2;

/// A top-level header and the text beneath it, borrowed from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    pub label: &'a str,
    pub body: &'a str,
}

/// Split a document into its top-level sections, in document order.
/// Text before the first header belongs to no section.
pub fn cluster_sections(document: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current: Option<(&str, usize)> = None;
    let mut offset = 0;

    for line in document.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let Some((level, text)) = heading(line) else {
            continue;
        };
        if level > SECTION_LEVEL {
            continue;
        }
        if let Some((label, body_start)) = current.take() {
            sections.push(Section {
                label,
                body: &document[body_start..line_start],
            });
        }
        current = Some((text, offset));
    }

    if let Some((label, body_start)) = current {
        sections.push(Section {
            label,
            body: &document[body_start..],
        });
    }

    sections
}

/// Body of the first section whose header matches one of `aliases`.
///
/// Aliases are tried in order, so an earlier alias wins even when a later
/// one appears first in the document. `None` means the profile simply has
/// no such section.
pub fn locate<'a>(document: &'a str, aliases: &[&str]) -> Option<&'a str> {
    let sections = cluster_sections(document);
    aliases.iter().find_map(|alias| {
        sections
            .iter()
            .find(|s| label_matches(s.label, alias))
            .map(|s| s.body)
    })
}

fn label_matches(label: &str, alias: &str) -> bool {
    normalize_label(label) == normalize_label(alias)
}

fn normalize_label(label: &str) -> String {
    label
        .replace("**", "")
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Jane Doe\nStaff Engineer\n\n## About\nBuilds things.\n\n## Work Experience\n- ### Engineer at Acme\n### Nested heading stays\n## Education\n- ### [MIT](https://mit.edu)\n";

    #[test]
    fn clusters_top_level_headers() {
        let sections = cluster_sections(DOC);
        let labels: Vec<&str> = sections.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["Jane Doe", "About", "Work Experience", "Education"]);
    }

    #[test]
    fn body_ends_at_next_top_level_header() {
        let body = locate(DOC, EXPERIENCE).unwrap();
        assert_eq!(body, "- ### Engineer at Acme\n### Nested heading stays\n");
    }

    #[test]
    fn body_runs_to_end_of_document() {
        let body = locate(DOC, EDUCATION).unwrap();
        assert_eq!(body, "- ### [MIT](https://mit.edu)\n");
    }

    #[test]
    fn case_insensitive_and_tolerant() {
        let doc = "## **SKILLS:**\n- Rust\n";
        assert_eq!(locate(doc, SKILLS), Some("- Rust\n"));
    }

    #[test]
    fn absent_section() {
        assert_eq!(locate(DOC, VOLUNTEERING), None);
        assert_eq!(locate("", ABOUT), None);
        assert_eq!(locate("no headers at all", ABOUT), None);
    }

    #[test]
    fn earlier_alias_wins() {
        let doc = "## Summary\nshort\n## About me\nlong\n";
        assert_eq!(locate(doc, ABOUT), Some("long\n"));
    }

    #[test]
    fn header_without_body() {
        let doc = "## Skills\n## Interests";
        assert_eq!(locate(doc, SKILLS), Some(""));
        assert_eq!(locate(doc, INTERESTS), Some(""));
    }

    #[test]
    fn level_three_is_not_a_section() {
        assert_eq!(locate("### Skills\n- Rust", SKILLS), None);
    }
}
