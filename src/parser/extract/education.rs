use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{at_linked, at_plain, date_range, first_line, first_match, tidy, without_date_range, Matcher};
use crate::parser::blocks::{is_marker_line, links, plain_text, split_entries, strip_bold, EntryMarker};
use crate::parser::sections::{locate, EDUCATION};
use crate::profile::EducationEntry;

static SCHOOL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\(([^)\s]+)\)").unwrap());

const INSTITUTION_WORDS: &[&str] = &[
    "university",
    "college",
    "school",
    "institute",
    "academy",
    "polytechnic",
    "conservatory",
    "seminary",
    "universidad",
    "université",
    "universität",
    "hochschule",
];

/// School plus the raw `degree[, field]` text, before the degree is split.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SchoolCapture {
    school: String,
    degree_field: Option<String>,
    url: Option<String>,
}

/// Most specific format first. The first tier that recovers a school wins.
const TIERS: &[Matcher<SchoolCapture>] = &[
    degree_at_linked_school,
    degree_at_plain_school,
    linked_school_then_degree,
    plain_school,
];

pub fn extract(document: &str) -> Vec<EducationEntry> {
    let Some(body) = locate(document, EDUCATION) else {
        return Vec::new();
    };

    split_entries(body, EntryMarker::SubHeading)
        .iter()
        .filter_map(|block| {
            let entry = parse_entry(block);
            if entry.is_none() {
                debug!(entry = %block, "dropping education entry without a school");
            }
            entry
        })
        .collect()
}

pub fn parse_entry(block: &str) -> Option<EducationEntry> {
    let cap = first_match(block, TIERS)?;
    let (degree, field_of_study) = cap
        .degree_field
        .as_deref()
        .map(split_degree)
        .unwrap_or((None, None));

    Some(EducationEntry {
        school: cap.school,
        degree,
        field_of_study,
        date_range: date_range(block),
        school_url: cap.url,
    })
}

/// `B.S. || Computer Science at [MIT](https://…)`
fn degree_at_linked_school(block: &str) -> Option<SchoolCapture> {
    at_linked(block).map(|c| SchoolCapture {
        school: c.right,
        degree_field: Some(c.left),
        url: c.url,
    })
}

/// `B.S., Computer Science at MIT`, only when the line carries no link.
fn degree_at_plain_school(block: &str) -> Option<SchoolCapture> {
    if !links(first_line(block)).is_empty() {
        return None;
    }
    at_plain(block).map(|c| SchoolCapture {
        school: c.right,
        degree_field: Some(c.left),
        url: None,
    })
}

/// `[MIT](https://…)` heading; the degree is usually the next descriptive line.
fn linked_school_then_degree(block: &str) -> Option<SchoolCapture> {
    let first = strip_bold(first_line(block));
    let caps = SCHOOL_LINK_RE.captures(&first)?;
    let school = tidy(&caps[1]);
    if school.is_empty() {
        return None;
    }

    let degree_field = block
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .skip(1)
        .find(|l| !is_marker_line(l))
        .map(|l| tidy(&plain_text(&without_date_range(l))))
        .filter(|d| !d.is_empty());

    Some(SchoolCapture {
        school,
        degree_field,
        url: Some(caps[2].to_string()),
    })
}

/// Bare school name. A lone line is only trusted when it names an institution;
/// otherwise the entry needs detail lines under it.
fn plain_school(block: &str) -> Option<SchoolCapture> {
    let first = first_line(block);
    if first.starts_with('[') {
        return None;
    }
    let school = tidy(&plain_text(&without_date_range(first)));
    if school.is_empty() {
        return None;
    }

    let has_details = block.lines().filter(|l| !l.trim().is_empty()).count() > 1;
    let lower = school.to_lowercase();
    let names_institution = INSTITUTION_WORDS.iter().any(|w| lower.contains(w));
    if !has_details && !names_institution {
        return None;
    }

    Some(SchoolCapture {
        school,
        degree_field: None,
        url: None,
    })
}

/// `"B.S. || CS"` / `"B.S., CS"` → degree and field; otherwise degree only.
fn split_degree(text: &str) -> (Option<String>, Option<String>) {
    let (degree, field) = if let Some((d, f)) = text.split_once("||") {
        (d, Some(f))
    } else if let Some((d, f)) = text.split_once(',') {
        (d, Some(f))
    } else {
        (text, None)
    };
    let non_empty = |s: &str| Some(tidy(s)).filter(|s| !s.is_empty());
    (non_empty(degree), field.and_then(non_empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linked_school_with_degree_and_field() {
        let md = "## Education\n- ### B.S. || Computer Science at [MIT](https://linkedin.com/school/mit) 2015 - 2019\n";
        let entries = extract(md);
        assert_eq!(
            entries,
            vec![EducationEntry {
                school: "MIT".into(),
                degree: Some("B.S.".into()),
                field_of_study: Some("Computer Science".into()),
                date_range: Some("2015 - 2019".into()),
                school_url: Some("https://linkedin.com/school/mit".into()),
            }]
        );
    }

    #[test]
    fn linked_tier_beats_plain_tier() {
        // Also reads as "<degree> at <school>" in plain text.
        let entry = parse_entry("MBA at [Wharton](https://wharton.edu) at night").unwrap();
        assert_eq!(entry.school, "Wharton");
        assert_eq!(entry.school_url.as_deref(), Some("https://wharton.edu"));
        assert_eq!(entry.degree.as_deref(), Some("MBA"));
    }

    #[test]
    fn plain_school_with_comma_field() {
        let entry = parse_entry("Master of Science, Physics at ETH Zurich\n2019 – 2021").unwrap();
        assert_eq!(entry.school, "ETH Zurich");
        assert_eq!(entry.degree.as_deref(), Some("Master of Science"));
        assert_eq!(entry.field_of_study.as_deref(), Some("Physics"));
        assert_eq!(entry.date_range.as_deref(), Some("2019 – 2021"));
        assert_eq!(entry.school_url, None);
    }

    #[test]
    fn degree_only() {
        let entry = parse_entry("PhD at Stanford University").unwrap();
        assert_eq!(entry.degree.as_deref(), Some("PhD"));
        assert_eq!(entry.field_of_study, None);
    }

    #[test]
    fn linked_school_degree_on_next_line() {
        let block = "[Oxford](https://linkedin.com/school/oxford)\n- 2010 - 2013\nBA, Philosophy\nRowing club";
        let entry = parse_entry(block).unwrap();
        assert_eq!(entry.school, "Oxford");
        assert_eq!(entry.school_url.as_deref(), Some("https://linkedin.com/school/oxford"));
        assert_eq!(entry.degree.as_deref(), Some("BA"));
        assert_eq!(entry.field_of_study.as_deref(), Some("Philosophy"));
        assert_eq!(entry.date_range.as_deref(), Some("2010 - 2013"));
    }

    #[test]
    fn linked_school_name_containing_at() {
        let entry = parse_entry("[University of Texas at Austin](https://linkedin.com/school/ut)\nBS, Physics").unwrap();
        assert_eq!(entry.school, "University of Texas at Austin");
        assert_eq!(entry.school_url.as_deref(), Some("https://linkedin.com/school/ut"));
        assert_eq!(entry.degree.as_deref(), Some("BS"));
        assert_eq!(entry.field_of_study.as_deref(), Some("Physics"));
    }

    #[test]
    fn degree_line_opening_with_a_digit() {
        let entry = parse_entry("[RISD](https://risd.edu)\n- 2016 - 2018\n2-year Diploma, Design").unwrap();
        assert_eq!(entry.school, "RISD");
        assert_eq!(entry.degree.as_deref(), Some("2-year Diploma"));
        assert_eq!(entry.field_of_study.as_deref(), Some("Design"));
        assert_eq!(entry.date_range.as_deref(), Some("2016 - 2018"));
    }

    #[test]
    fn linked_school_alone() {
        let entry = parse_entry("[Oxford](https://ox.ac.uk)").unwrap();
        assert_eq!(entry.school, "Oxford");
        assert_eq!(entry.degree, None);
    }

    #[test]
    fn plain_school_name() {
        let entry = parse_entry("Lincoln High School").unwrap();
        assert_eq!(entry.school, "Lincoln High School");
        assert_eq!(entry.degree, None);
        assert_eq!(entry.school_url, None);

        let entry = parse_entry("Le Wagon\nBootcamp\n2021 - 2021").unwrap();
        assert_eq!(entry.school, "Le Wagon");
        assert_eq!(entry.date_range.as_deref(), Some("2021 - 2021"));
    }

    #[test]
    fn free_text_without_separator_is_dropped() {
        let md = "## Education\n- ### Some text with no 'at' separator\n";
        assert!(extract(md).is_empty());
    }

    #[test]
    fn one_bad_entry_does_not_sink_the_rest() {
        let md = "## Education\n- ### ???\n- ### BSc at [UCL](https://ucl.ac.uk)\n";
        let entries = extract(md);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].school, "UCL");
    }

    #[test]
    fn degree_split_rules() {
        assert_eq!(
            split_degree("B.S. || Computer Science, Minor"),
            (Some("B.S.".into()), Some("Computer Science, Minor".into()))
        );
        assert_eq!(split_degree("B.A."), (Some("B.A.".into()), None));
        assert_eq!(split_degree("B.A.,"), (Some("B.A.".into()), None));
    }
}
