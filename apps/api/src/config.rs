use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Provider keys are optional: a missing crawl key makes the managed crawl
/// strategy fail over to direct scraping, and a missing Anthropic key
/// degrades relevance scoring to the deterministic fallback.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub crawl_api_url: String,
    pub crawl_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub daily_search_limit: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            crawl_api_url: std::env::var("CRAWL_API_URL")
                .unwrap_or_else(|_| "https://api.firecrawl.dev/v1/search".to_string()),
            crawl_api_key: optional_env("CRAWL_API_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            daily_search_limit: std::env::var("DAILY_SEARCH_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<i64>()
                .context("DAILY_SEARCH_LIMIT must be an integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Empty values count as unset so a blank line in .env does not enable a provider.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
