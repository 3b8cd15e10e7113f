use anyhow::{Context, Result};
use quick_xml::events::Event;
use regex::Regex;
use tracing::{info, warn};

/// `<loc>` entries of one sitemap document.
#[derive(Debug, Default, PartialEq, Eq)]
struct Sitemap {
    /// `<url><loc>` page URLs.
    pages: Vec<String>,
    /// `<sitemap><loc>` child sitemaps of a sitemap index.
    children: Vec<String>,
}

/// Fetch a sitemap (following one level of sitemap index) and keep the URLs
/// matching the profile pattern.
pub async fn fetch_profile_urls(sitemap_url: &str, pattern: &Regex) -> Result<Vec<String>> {
    let client = reqwest::Client::new();

    let root = fetch_sitemap(&client, sitemap_url).await?;
    let mut all_urls = root.pages;
    for child in &root.children {
        match fetch_sitemap(&client, child).await {
            Ok(sitemap) => all_urls.extend(sitemap.pages),
            Err(e) => warn!("Skipping child sitemap {}: {:#}", child, e),
        }
    }
    info!("Total URLs in sitemap: {}", all_urls.len());

    let filtered: Vec<String> = all_urls.into_iter().filter(|url| pattern.is_match(url)).collect();
    info!("Profile pages after filtering: {}", filtered.len());
    Ok(filtered)
}

async fn fetch_sitemap(client: &reqwest::Client, url: &str) -> Result<Sitemap> {
    info!("Fetching sitemap: {}", url);
    let xml = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .with_context(|| format!("Failed to fetch sitemap {}", url))?;
    parse_sitemap(&xml)
}

#[derive(Clone, Copy)]
enum Entry {
    Url,
    Sitemap,
}

fn parse_sitemap(xml: &str) -> Result<Sitemap> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut sitemap = Sitemap::default();
    let mut parent: Option<Entry> = None;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"url" => parent = Some(Entry::Url),
                b"sitemap" => parent = Some(Entry::Sitemap),
                b"loc" if parent.is_some() => in_loc = true,
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => {
                let loc = e.unescape()?.trim().to_string();
                match parent {
                    Some(Entry::Url) => sitemap.pages.push(loc),
                    Some(Entry::Sitemap) => sitemap.children.push(loc),
                    None => {}
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"loc" => in_loc = false,
                b"url" | b"sitemap" => parent = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(sitemap)
}
