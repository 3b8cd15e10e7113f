use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::ConfigBuilder;
use regex::Regex;
use serde::Deserialize;

const CONFIG_FILE: &str = "profile_parser";
const ENV_PREFIX: &str = "PROFILE";

/// Runtime settings: `profile_parser.toml` (optional), then `PROFILE_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: String,
    pub concurrency: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub spider_api_key: Option<String>,
    pub sitemap_url: Option<String>,
    pub profile_url_pattern: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: "data/profiles.sqlite".to_string(),
            concurrency: 10,
            max_retries: 3,
            base_backoff_ms: 2000,
            spider_api_key: None,
            sitemap_url: None,
            profile_url_pattern: r"^https://(?:[a-z]{2,3}\.)?(?:www\.)?linkedin\.com/in/[A-Za-z0-9_%-]+/?$"
                .to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.profile_url_regex()?;
        if settings.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        Ok(settings)
    }

    /// Configured key, else the `SPIDER_API_KEY` the spider client documents.
    pub fn spider_api_key(&self) -> Option<String> {
        self.spider_api_key
            .clone()
            .or_else(|| std::env::var("SPIDER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn profile_url_regex(&self) -> Result<Regex> {
        Regex::new(&self.profile_url_pattern)
            .with_context(|| format!("Invalid profile_url_pattern: {}", self.profile_url_pattern))
    }
}
