pub mod blocks;
pub mod extract;
pub mod sections;

use crate::db::ScrapedPage;
use crate::profile::{ProfileRecord, RawDocument};

/// Build a profile record from raw markdown.
///
/// Never fails: a missing section leaves its field empty and an entry no
/// pattern recognizes is left out.
pub fn parse_profile(
    raw_markdown: &str,
    author_name: &str,
    image_url: Option<&str>,
    source_url: &str,
) -> ProfileRecord {
    let data = extract::extract_all(raw_markdown);

    ProfileRecord {
        name: author_name.to_string(),
        headline: headline(raw_markdown, author_name),
        about: data.about,
        experience: data.experience,
        education: data.education,
        projects: data.projects,
        volunteering: data.volunteering,
        skills: data.skills,
        interests: data.interests,
        url: source_url.to_string(),
        image: image_url.map(str::to_string),
        raw_text: raw_markdown.to_string(),
    }
}

pub fn parse_document(doc: &RawDocument, source_url: &str) -> ProfileRecord {
    parse_profile(&doc.text, &doc.author, doc.image.as_deref(), source_url)
}

pub fn process_page(page: &ScrapedPage) -> ProfileRecord {
    parse_document(&page.document, &page.url)
}

/// Line two when line one carries the person's name, else line one.
fn headline(raw: &str, name: &str) -> String {
    let mut lines = raw.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.next()) {
        (Some(first), Some(second)) if first.contains(name) => second.to_string(),
        (Some(first), _) => first.to_string(),
        (None, _) => String::new(),
    }
}
