use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::warn;

use crate::profile::{ProfileRecord, RawDocument};

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_visited ON pages(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            id         INTEGER PRIMARY KEY,
            page_id    INTEGER NOT NULL REFERENCES pages(id),
            url        TEXT NOT NULL,
            markdown   TEXT,
            author     TEXT,
            image      TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            scraped_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_url ON page_data(url);

        CREATE TABLE IF NOT EXISTS profiles (
            url              TEXT PRIMARY KEY,
            page_data_id     INTEGER NOT NULL REFERENCES page_data(id),
            name             TEXT NOT NULL,
            headline         TEXT NOT NULL,
            about            TEXT NOT NULL,
            record           TEXT NOT NULL,
            experience_count INTEGER NOT NULL DEFAULT 0,
            education_count  INTEGER NOT NULL DEFAULT 0,
            skills_count     INTEGER NOT NULL DEFAULT 0,
            processed_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Scraping ──

pub fn insert_pages(conn: &Connection, urls: &[String]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO pages (url) VALUES (?1)")?;
        for url in urls {
            count += stmt.execute(rusqlite::params![url])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_unvisited(conn: &Connection, limit: Option<usize>) -> Result<Vec<(i64, String)>> {
    let sql = format!(
        "SELECT id, url FROM pages WHERE visited = 0 ORDER BY id{}",
        limit_clause(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Outcome of one fetch; exactly one of `markdown` / `error` is normally set.
pub struct ScrapeRow {
    pub page_id: i64,
    pub url: String,
    pub markdown: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub status: Option<i32>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

// ── Processing ──

pub struct ScrapedPage {
    pub page_data_id: i64,
    pub url: String,
    pub document: RawDocument,
}

/// Latest scrape per URL whose profile is missing or built from an older scrape.
pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<ScrapedPage>> {
    let sql = format!(
        "SELECT pd.id, pd.url, pd.markdown, COALESCE(pd.author, ''), pd.image
         FROM page_data pd
         LEFT JOIN profiles p ON p.url = pd.url
         WHERE pd.markdown IS NOT NULL
           AND (p.url IS NULL OR p.page_data_id < pd.id)
           AND pd.id = (SELECT MAX(id) FROM page_data WHERE url = pd.url AND markdown IS NOT NULL)
         ORDER BY pd.id{}",
        limit_clause(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ScrapedPage {
                page_data_id: row.get(0)?,
                url: row.get(1)?,
                document: RawDocument {
                    text: row.get(2)?,
                    author: row.get(3)?,
                    image: row.get(4)?,
                },
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Store parsed profiles keyed by URL, replacing earlier parses.
pub fn save_profiles(conn: &Connection, rows: &[(i64, ProfileRecord)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO profiles
             (url, page_data_id, name, headline, about, record,
              experience_count, education_count, skills_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for (page_data_id, p) in rows {
            let record = serde_json::to_string(p)?;
            count += stmt.execute(rusqlite::params![
                p.url,
                page_data_id,
                p.name,
                p.headline,
                p.about,
                record,
                p.experience.len() as i64,
                p.education.len() as i64,
                p.skills.len() as i64,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_profiles(conn: &Connection, limit: Option<usize>) -> Result<Vec<ProfileRecord>> {
    let sql = format!("SELECT url, record FROM profiles ORDER BY url{}", limit_clause(limit));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut profiles = Vec::with_capacity(rows.len());
    for (url, json) in rows {
        match serde_json::from_str::<ProfileRecord>(&json) {
            Ok(record) => profiles.push(record),
            Err(e) => warn!("Skipping unreadable profile {}: {}", url, e),
        }
    }
    Ok(profiles)
}

// ── Overview ──

pub struct OverviewRow {
    pub url: String,
    pub name: String,
    pub headline: String,
    pub experience_count: i64,
    pub education_count: i64,
    pub skills_count: i64,
}

pub fn fetch_overview(conn: &Connection, limit: usize) -> Result<Vec<OverviewRow>> {
    let mut stmt = conn.prepare(
        "SELECT url, name, headline, experience_count, education_count, skills_count
         FROM profiles
         ORDER BY processed_at DESC, url
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![limit as i64], |row| {
            Ok(OverviewRow {
                url: row.get(0)?,
                name: row.get(1)?,
                headline: row.get(2)?,
                experience_count: row.get(3)?,
                education_count: row.get(4)?,
                skills_count: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub scraped: usize,
    pub errors: usize,
    pub processed: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
    let visited: usize =
        conn.query_row("SELECT COUNT(*) FROM pages WHERE visited = 1", [], |r| r.get(0))?;
    let scraped: usize = conn.query_row("SELECT COUNT(*) FROM page_data", [], |r| r.get(0))?;
    let errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let processed: usize = conn.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))?;
    Ok(Stats {
        total,
        visited,
        unvisited: total - visited,
        scraped,
        errors,
        processed,
    })
}

fn limit_clause(limit: Option<usize>) -> String {
    match limit {
        Some(n) => format!(" LIMIT {}", n),
        None => String::new(),
    }
}
