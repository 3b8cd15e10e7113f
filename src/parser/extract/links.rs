use std::sync::LazyLock;

use regex::Regex;

use super::dedupe;

static PROFILE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:[a-z]{2,3}\.)?(?:www\.)?linkedin\.com/in/([A-Za-z0-9_%-]+)").unwrap()
});

/// Every profile URL mentioned in `text`, normalized and deduplicated in
/// order of first mention.
pub fn discover_profile_urls(text: &str) -> Vec<String> {
    let urls = PROFILE_URL_RE
        .captures_iter(text)
        .map(|c| format!("https://www.linkedin.com/in/{}", &c[1]))
        .collect();
    dedupe(urls)
}
