pub mod education;
pub mod experience;
pub mod interests;
pub mod links;
pub mod projects;
pub mod skills;
pub mod volunteering;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::blocks::{plain_text, strip_bold};
use super::sections::{self, locate};
use crate::profile::{EducationEntry, ProjectEntry, VolunteerEntry};

const MONTH: &str = r"(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+";

static YEAR_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{m})?(?:19|20)\d{{2}}\s*[-–—]\s*(?:(?:{m})?(?:19|20)\d{{2}}|present)\b",
        m = MONTH
    ))
    .unwrap()
});
static YEAR_RANGE_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\(?\s*{}\s*\)?", YEAR_RANGE_RE.as_str())).unwrap()
});
static AT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(?i:at)\s+\[([^\]]+)\]\(([^)\s]+)\)").unwrap());
static AT_PLAIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?)\s+(?i:at)\s+(.+)$").unwrap());

/// Everything recovered from labeled sections of one document.
#[derive(Debug, Default)]
pub struct ExtractedData {
    pub about: String,
    pub experience: Vec<String>,
    pub education: Vec<EducationEntry>,
    pub projects: Vec<ProjectEntry>,
    pub volunteering: Vec<VolunteerEntry>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
}

/// Run every section extractor over `document`. Sections are independent;
/// a missing one leaves its field empty.
pub fn extract_all(document: &str) -> ExtractedData {
    ExtractedData {
        about: locate(document, sections::ABOUT)
            .map(|body| body.trim().to_string())
            .unwrap_or_default(),
        experience: experience::extract(document),
        education: education::extract(document),
        projects: projects::extract(document),
        volunteering: volunteering::extract(document),
        skills: skills::extract(document),
        interests: interests::extract(document),
    }
}

/// `"<left> at <right>"`, either side possibly linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCapture {
    pub left: String,
    pub right: String,
    pub url: Option<String>,
}

/// A pattern tier: returns a capture when its required groups are all present.
pub type Matcher<T> = fn(&str) -> Option<T>;

/// Try `matchers` in order; the first one that produces a value wins.
pub fn first_match<T>(input: &str, matchers: &[Matcher<T>]) -> Option<T> {
    matchers.iter().find_map(|matcher| matcher(input))
}

/// `<left> at [<right>](<url>)` on the first line of `block`.
pub fn at_linked(block: &str) -> Option<AtCapture> {
    let line = strip_bold(first_line(block));
    let caps = AT_LINK_RE.captures(&line)?;
    let left = tidy(&plain_text(&caps[1]));
    let right = tidy(&caps[2]);
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some(AtCapture {
        left,
        right,
        url: Some(caps[3].to_string()),
    })
}

/// `<left> at <right>` in plain text on the first line of `block`.
pub fn at_plain(block: &str) -> Option<AtCapture> {
    let line = strip_bold(first_line(block));
    let caps = AT_PLAIN_RE.captures(&line)?;
    let left = tidy(&plain_text(&caps[1]));
    let right = tidy(&plain_text(&without_date_range(&caps[2])));
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some(AtCapture {
        left,
        right,
        url: None,
    })
}

/// First `YYYY - YYYY|Present` span in `text`, verbatim.
pub fn date_range(text: &str) -> Option<String> {
    YEAR_RANGE_RE.find(text).map(|m| m.as_str().trim().to_string())
}

pub fn without_date_range(text: &str) -> String {
    YEAR_RANGE_STRIP_RE.replace_all(text, " ").to_string()
}

/// Build a regex for `Label: value` lines, bullets and bold tolerated.
pub fn label_regex(labels: &[&str]) -> Regex {
    let alternatives = labels
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?im)^[ \t]*(?:[-*+][ \t]+)?\*{{0,2}}(?:{})\*{{0,2}}[ \t]*:[ \t]*(.+?)[ \t]*$",
        alternatives
    ))
    .unwrap()
}

/// Value of the first line in `block` matching `re` (built by [`label_regex`]).
pub fn labeled_value(block: &str, re: &Regex) -> Option<String> {
    re.captures_iter(block)
        .map(|c| plain_text(&c[1]))
        .find(|v| !v.is_empty())
}

/// Drop repeated strings, keeping the first occurrence of each in order.
pub fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

pub fn first_line(block: &str) -> &str {
    block.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

/// Trim whitespace and the separators profiles put around dates and links.
pub fn tidy(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '·' | '|' | '-' | '–' | '—' | ',' | ':'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_ranges() {
        assert_eq!(date_range("B.S. at MIT 2015 - 2019").as_deref(), Some("2015 - 2019"));
        assert_eq!(date_range("2018–Present").as_deref(), Some("2018–Present"));
        assert_eq!(date_range("2018 - present").as_deref(), Some("2018 - present"));
        assert_eq!(
            date_range("Sep 2015 - Jun 2019 · 4 yrs").as_deref(),
            Some("Sep 2015 - Jun 2019")
        );
        assert_eq!(date_range("founded 2015"), None);
        assert_eq!(date_range("call 1234 - 5678"), None);
    }

    #[test]
    fn strips_range_with_parens() {
        assert_eq!(tidy(&without_date_range("Acme (2015 - 2019)")), "Acme");
        assert_eq!(tidy(&without_date_range("Acme · 2015 - Present")), "Acme");
    }

    #[test]
    fn linked_form() {
        let cap = at_linked("Engineer at [Acme](https://linkedin.com/company/acme)").unwrap();
        assert_eq!(cap.left, "Engineer");
        assert_eq!(cap.right, "Acme");
        assert_eq!(cap.url.as_deref(), Some("https://linkedin.com/company/acme"));
        assert!(at_linked("Engineer at Acme").is_none());
    }

    #[test]
    fn bold_around_link() {
        let cap = at_linked("**Engineer** at **[Acme](https://acme.io)**").unwrap();
        assert_eq!(cap.left, "Engineer");
        assert_eq!(cap.right, "Acme");
    }

    #[test]
    fn plain_form() {
        let cap = at_plain("Head of Data at Beta Corp 2019 - Present\nmore").unwrap();
        assert_eq!(cap.left, "Head of Data");
        assert_eq!(cap.right, "Beta Corp");
        assert_eq!(cap.url, None);
        assert!(at_plain("No separator here").is_none());
        assert!(at_plain("at Acme").is_none());
    }

    #[test]
    fn first_match_short_circuits() {
        fn never(_: &str) -> Option<u8> {
            None
        }
        fn one(_: &str) -> Option<u8> {
            Some(1)
        }
        fn two(_: &str) -> Option<u8> {
            Some(2)
        }
        assert_eq!(first_match("", &[never, one, two]), Some(1));
        assert_eq!(first_match::<u8>("", &[never]), None);
    }

    #[test]
    fn labels() {
        let re = label_regex(&["Date", "Duration"]);
        let block = "Tracer\n- **Duration:** 2020 - 2021\nDate: later";
        assert_eq!(labeled_value(block, &re).as_deref(), Some("2020 - 2021"));
        let re = label_regex(&["Associated with", "At", "For"]);
        assert_eq!(
            labeled_value("x\n**For**: [Acme](https://acme.io)", &re).as_deref(),
            Some("Acme")
        );
        assert_eq!(labeled_value("Attended: yes", &re), None);
    }

    #[test]
    fn dedupe_keeps_first() {
        let items = vec!["b", "a", "b", "c", "a", "B"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedupe(items), vec!["b", "a", "c", "B"]);
    }

    #[test]
    fn empty_document_extracts_nothing() {
        let data = extract_all("");
        assert!(data.about.is_empty());
        assert!(data.experience.is_empty());
        assert!(data.skills.is_empty());
    }
}
