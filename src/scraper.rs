use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use rusqlite::Connection;
use serde_json::Value;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::db::ScrapeRow;
use crate::profile::RawDocument;

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("no spider API key configured (set SPIDER_API_KEY or PROFILE_SPIDER_API_KEY)")]
    MissingApiKey,
    #[error("failed to create spider client: {0}")]
    Client(String),
    #[error("spider request failed: {0}")]
    Request(String),
    #[error("no content returned for {url}")]
    EmptyContent { url: String },
}

/// Scrape stats returned after completion.
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    base_backoff_ms: u64,
}

/// What one spider response yields before it becomes a `RawDocument`.
#[derive(Debug, Default, PartialEq, Eq)]
struct SpiderPage {
    content: Option<String>,
    author: Option<String>,
    image: Option<String>,
    status: Option<i32>,
}

/// Build the spider client once; callers share it through the returned `Arc`.
pub fn build_client(settings: &Settings) -> Result<Arc<Spider>, ScrapeError> {
    let api_key = settings.spider_api_key().ok_or(ScrapeError::MissingApiKey)?;
    let spider = Spider::new(Some(api_key)).map_err(|e| ScrapeError::Client(e.to_string()))?;
    Ok(Arc::new(spider))
}

/// Scrape pages concurrently, saving each result to DB as it arrives.
pub async fn scrape_pages_streaming(
    conn: &Connection,
    spider: Arc<Spider>,
    settings: &Settings,
    pages: Vec<(i64, String)>,
) -> Result<ScrapeStats> {
    let semaphore = Arc::new(Semaphore::new(settings.concurrency));
    let policy = RetryPolicy {
        max_retries: settings.max_retries,
        base_backoff_ms: settings.base_backoff_ms,
    };
    let total = pages.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Workers send results, this loop saves them
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ScrapeRow>(settings.concurrency * 2);

    for (page_id, url) in pages {
        let spider = Arc::clone(&spider);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let row = scrape_with_retry(&spider, policy, page_id, &url).await;
            let _ = tx.send(row).await;
        });
    }

    // rx closes once every spawned task has dropped its sender
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;

    let mut insert_stmt = conn.prepare(
        "INSERT INTO page_data (page_id, url, markdown, author, image, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut update_stmt = conn.prepare(
        "UPDATE pages SET visited = 1, visited_at = datetime('now') WHERE id = ?1",
    )?;

    while let Some(row) = rx.recv().await {
        if let Some(e) = &row.error {
            warn!("Scrape failed for {}: {}", row.url, e);
            errors += 1;
        } else {
            ok += 1;
        }

        save_one(&mut insert_stmt, &mut update_stmt, &row)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Scraped {} pages ({} ok, {} errors)", total, ok, errors);

    Ok(ScrapeStats { total, ok, errors })
}

fn save_one(
    insert: &mut rusqlite::Statement,
    update: &mut rusqlite::Statement,
    row: &ScrapeRow,
) -> Result<()> {
    insert.execute(rusqlite::params![
        row.page_id, row.url, row.markdown, row.author, row.image, row.status, row.error, row.latency_ms,
    ])?;
    update.execute(rusqlite::params![row.page_id])?;
    Ok(())
}

async fn scrape_with_retry(spider: &Spider, policy: RetryPolicy, page_id: i64, url: &str) -> ScrapeRow {
    let mut attempt = 0;
    loop {
        let row = scrape_one(spider, page_id, url).await;
        let retryable = row.error.as_deref().is_some_and(is_retryable);
        if !retryable || attempt >= policy.max_retries {
            return row;
        }

        let backoff = Duration::from_millis(policy.base_backoff_ms * 2u64.pow(attempt));
        warn!(
            "Rate limited on {} (attempt {}/{}), backing off {:.1}s",
            url,
            attempt + 1,
            policy.max_retries,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}

fn is_retryable(error: &str) -> bool {
    ["429", "rate", "500", "502", "503"]
        .iter()
        .any(|code| error.contains(code))
}

async fn scrape_one(spider: &Spider, page_id: i64, url: &str) -> ScrapeRow {
    let start = Instant::now();
    let response = spider
        .scrape_url(url, Some(markdown_params()), "application/json")
        .await;
    let elapsed = start.elapsed().as_millis() as i64;

    match response {
        Ok(value) => {
            let page = read_response(value);
            let error = page
                .content
                .is_none()
                .then(|| ScrapeError::EmptyContent { url: url.to_string() }.to_string());
            ScrapeRow {
                page_id,
                url: url.to_string(),
                markdown: page.content,
                author: page.author,
                image: page.image,
                status: page.status,
                error,
                latency_ms: Some(elapsed),
            }
        }
        Err(e) => ScrapeRow {
            page_id,
            url: url.to_string(),
            markdown: None,
            author: None,
            image: None,
            status: None,
            error: Some(ScrapeError::Request(e.to_string()).to_string()),
            latency_ms: Some(elapsed),
        },
    }
}

/// Scrape a single profile URL into a document ready for parsing.
pub async fn scrape_profile(spider: &Spider, url: &str) -> Result<RawDocument, ScrapeError> {
    let response = spider
        .scrape_url(url, Some(markdown_params()), "application/json")
        .await
        .map_err(|e| ScrapeError::Request(e.to_string()))?;

    let page = read_response(response);
    debug!(url, status = ?page.status, "spider response");
    let text = page.content.ok_or_else(|| ScrapeError::EmptyContent { url: url.to_string() })?;

    Ok(RawDocument {
        text,
        author: page.author.unwrap_or_default(),
        image: page.image,
    })
}

fn markdown_params() -> RequestParams {
    RequestParams {
        return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
        ..Default::default()
    }
}

fn read_response(value: Value) -> SpiderPage {
    let parsed: Value = match value.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(value.clone()),
        None => value,
    };

    let Some(first) = parsed.as_array().and_then(|arr| arr.first()) else {
        return SpiderPage::default();
    };

    let content = first
        .get("content")
        .and_then(Value::as_str)
        .map(strip_images)
        .filter(|c| !c.trim().is_empty());

    let status = first.get("status").and_then(Value::as_i64).map(|s| s as i32);

    let meta = |keys: &[&str]| -> Option<String> {
        let sources = [first.get("metadata"), Some(first)];
        sources.into_iter().flatten().find_map(|obj| {
            keys.iter().find_map(|k| {
                obj.get(*k)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        })
    };

    let author = meta(&["author"]).or_else(|| meta(&["title"]).map(|t| name_from_title(&t)));
    let image = meta(&["image", "og_image", "og:image"]);

    SpiderPage {
        content,
        author,
        image,
        status,
    }
}

/// `"Jane Doe - Staff Engineer - Acme | LinkedIn"` → `"Jane Doe"`
fn name_from_title(title: &str) -> String {
    title
        .split(" | ")
        .next()
        .and_then(|t| t.split(" - ").next())
        .unwrap_or(title)
        .trim()
        .to_string()
}

/// Remove markdown image syntax: ![alt](url)
fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}
