mod config;
mod db;
mod output;
mod parser;
mod profile;
mod scraper;
mod sitemap;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::parser::extract::links::discover_profile_urls;

#[derive(Parser)]
#[command(name = "profile_parser", about = "Profile scraper and markdown profile parser via spider.cloud")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate the URL queue from a sitemap or a markdown/text file
    Init {
        /// Sitemap URL (default: `sitemap_url` from config)
        #[arg(long)]
        sitemap: Option<String>,
        /// File to scan for profile links instead of a sitemap
        #[arg(long, conflicts_with = "sitemap")]
        file: Option<PathBuf>,
    },
    /// Scrape unvisited pages via spider.cloud
    Scrape {
        /// Max pages to scrape (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse scraped markdown into profile records
    Process {
        /// Max pages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape + process in one pipeline
    Run {
        /// Max pages to scrape+process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse a local markdown file and print the record as JSON
    Parse {
        file: PathBuf,
        /// Person's display name
        #[arg(short, long, default_value = "")]
        author: String,
        /// Profile image URL
        #[arg(long)]
        image: Option<String>,
        /// Source URL recorded on the profile
        #[arg(long, default_value = "")]
        url: String,
        /// Write JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Scrape one profile URL and print the parsed record
    Fetch {
        url: String,
        /// Write JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Export processed profiles to a JSON file
    Export {
        #[arg(short, long, default_value = "data/profiles.json")]
        out: PathBuf,
        /// Max profiles to export (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show scraping statistics
    Stats,
    /// Processed profiles overview table
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { sitemap, file } => {
            let settings = Settings::load()?;
            let conn = open_db(&settings)?;
            let urls = match file {
                Some(path) => urls_from_file(&path)?,
                None => {
                    let sitemap_url = sitemap
                        .or_else(|| settings.sitemap_url.clone())
                        .context("No sitemap given: pass --sitemap, --file, or set sitemap_url")?;
                    sitemap::fetch_profile_urls(&sitemap_url, &settings.profile_url_regex()?).await?
                }
            };
            let inserted = db::insert_pages(&conn, &urls)?;
            println!("Inserted {} new profile URLs ({} total found)", inserted, urls.len());
            Ok(())
        }
        Commands::Scrape { limit } => {
            let settings = Settings::load()?;
            let conn = open_db(&settings)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first or all pages are scraped.");
                return Ok(());
            }
            let spider = scraper::build_client(&settings)?;
            println!("Scraping {} pages (streaming to DB)...", pages.len());
            let stats = scraper::scrape_pages_streaming(&conn, spider, &settings, pages).await?;
            println!(
                "Done: {} scraped ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit } => {
            let settings = Settings::load()?;
            let conn = open_db(&settings)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'scrape' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages)?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let settings = Settings::load()?;
            let conn = open_db(&settings)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first.");
                return Ok(());
            }
            let spider = scraper::build_client(&settings)?;

            // Phase 1: Scrape (streaming to DB)
            let t_scrape = Instant::now();
            println!("Pipeline: scraping {} pages (streaming to DB)...", pages.len());
            let stats = scraper::scrape_pages_streaming(&conn, spider, &settings, pages).await?;
            println!(
                "Scraped {} pages ({} ok, {} errors) in {:.1}s",
                stats.total, stats.ok, stats.errors, t_scrape.elapsed().as_secs_f64()
            );

            // Phase 2: Process
            let t_process = Instant::now();
            let unprocessed = db::fetch_unprocessed(&conn, None)?;
            if unprocessed.is_empty() {
                println!("Nothing to process (all scraped pages had errors).");
                return Ok(());
            }
            println!("Processing {} pages...", unprocessed.len());
            let counts = process_pages(&conn, &unprocessed)?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            counts.print();
            Ok(())
        }
        Commands::Parse { file, author, image, url, out } => {
            let record = parse_file(&file, &author, image.as_deref(), &url)?;
            emit(&record, out.as_deref())
        }
        Commands::Fetch { url, out } => {
            let settings = Settings::load()?;
            let spider = scraper::build_client(&settings)?;
            let doc = scraper::scrape_profile(&spider, &url).await?;
            let record = parser::parse_document(&doc, &url);
            emit(&record, out.as_deref())
        }
        Commands::Export { out, limit } => {
            let settings = Settings::load()?;
            let conn = open_db(&settings)?;
            let profiles = db::fetch_profiles(&conn, limit)?;
            output::write_export(&out, &profiles)?;
            println!("Exported {} profiles to {}", profiles.len(), out.display());
            Ok(())
        }
        Commands::Overview { limit } => {
            let settings = Settings::load()?;
            let conn = open_db(&settings)?;
            let rows = db::fetch_overview(&conn, limit)?;
            if rows.is_empty() {
                println!("No profiles found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:<40} | {:>4} | {:>4} | {:>6}",
                "#", "Name", "Headline", "Exp", "Edu", "Skills"
            );
            println!("{}", "-".repeat(95));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<24} | {:<40} | {:>4} | {:>4} | {:>6}",
                    i + 1,
                    truncate(&r.name, 24),
                    truncate(&r.headline, 40),
                    r.experience_count,
                    r.education_count,
                    r.skills_count
                );
            }

            println!("\n--- URLs ---");
            for (i, r) in rows.iter().enumerate() {
                println!("{:>3}  {}", i + 1, r.url);
            }

            println!("\n{} profiles", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let settings = Settings::load()?;
            let conn = open_db(&settings)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            println!("Visited:   {}", s.visited);
            println!("Unvisited: {}", s.unvisited);
            println!("Scraped:   {}", s.scraped);
            println!("Errors:    {}", s.errors);
            println!("Processed: {}", s.processed);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_db(settings: &Settings) -> anyhow::Result<rusqlite::Connection> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

/// Parse a local markdown file; needs no configuration.
fn parse_file(path: &Path, author: &str, image: Option<&str>, url: &str) -> anyhow::Result<profile::ProfileRecord> {
    let markdown = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parser::parse_profile(&markdown, author, image, url))
}

fn urls_from_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(discover_profile_urls(&text))
}

fn emit(record: &profile::ProfileRecord, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            output::write_record(path, record)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", output::record_json(record)?),
    }
    Ok(())
}

struct ProcessCounts {
    profiles: usize,
    experience: usize,
    education: usize,
    projects: usize,
    volunteering: usize,
    skills: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} profiles: {} experience, {} education, {} projects, {} volunteering, {} skills.",
            self.profiles, self.experience, self.education, self.projects, self.volunteering, self.skills,
        );
    }
}

fn process_pages(
    conn: &rusqlite::Connection,
    pages: &[db::ScrapedPage],
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        profiles: 0,
        experience: 0,
        education: 0,
        projects: 0,
        volunteering: 0,
        skills: 0,
    };

    for chunk in pages.chunks(500) {
        let records: Vec<_> = chunk
            .par_iter()
            .map(|page| (page.page_data_id, parser::process_page(page)))
            .collect();

        for (_, r) in &records {
            counts.experience += r.experience.len();
            counts.education += r.education.len();
            counts.projects += r.projects.len();
            counts.volunteering += r.volunteering.len();
            counts.skills += r.skills.len();
        }

        counts.profiles += db::save_profiles(conn, &records)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_urls_from_search_page() {
        let urls = urls_from_file(Path::new("tests/fixtures/people_search.md")).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.linkedin.com/in/janedoe",
                "https://www.linkedin.com/in/samlee",
            ]
        );
    }

    #[test]
    fn parse_ignores_broken_configuration() {
        std::env::set_var("PROFILE_CONCURRENCY", "not-a-number");
        assert!(Settings::load().is_err());

        let cli = Cli::try_parse_from(["profile_parser", "parse", "tests/fixtures/sparse.md", "-a", "Sam Lee"]).unwrap();
        let Commands::Parse { file, author, image, url, .. } = cli.command else {
            panic!("expected parse command");
        };
        let record = parse_file(&file, &author, image.as_deref(), &url).unwrap();
        std::env::remove_var("PROFILE_CONCURRENCY");

        assert_eq!(record.name, "Sam Lee");
        assert_eq!(record.headline, "Product Designer");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(urls_from_file(Path::new("tests/fixtures/nope.md")).is_err());
    }

    #[test]
    fn processes_scraped_pages_into_profiles() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        db::insert_pages(&conn, &["https://www.linkedin.com/in/janedoe".to_string()]).unwrap();
        conn.execute(
            "INSERT INTO page_data (page_id, url, markdown, author) VALUES (1, ?1, ?2, 'Jane Doe')",
            rusqlite::params![
                "https://www.linkedin.com/in/janedoe",
                std::fs::read_to_string("tests/fixtures/jane_doe.md").unwrap()
            ],
        )
        .unwrap();

        let pages = db::fetch_unprocessed(&conn, None).unwrap();
        let counts = process_pages(&conn, &pages).unwrap();
        assert_eq!(counts.profiles, 1);
        assert_eq!(counts.experience, 3);
        assert_eq!(counts.education, 2);
        assert_eq!(counts.skills, 4);
        assert!(db::fetch_unprocessed(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn truncates_by_chars() {
        assert_eq!(truncate("Jane", 10), "Jane");
        assert_eq!(truncate("Ünïcödé Name", 7), "Ünïcödé...");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(std::time::Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_duration(std::time::Duration::from_secs(3725)), "1h 2m 5s");
    }
}
