//! Managed crawl strategy, the primary fetch path.
//!
//! Issues a single composed query against the crawl/extraction provider and
//! turns accepted result pages into postings. An unconfigured API key is a
//! `FetchError`, not an empty result, so the fallback chain can engage.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::discovery::fetch::classify::is_job_posting_page;
use crate::discovery::fetch::parse::{
    detect_experience_level, detect_remote, extract_requirements, parse_salary,
};
use crate::discovery::fetch::{FetchError, SourceFetcher};
use crate::models::posting::{JobPosting, JobSource, SearchFilters};

/// Fixed job-board allow-list for the composed crawl query. Caller-specified
/// extra domains are appended per request.
pub const JOB_BOARD_DOMAINS: &[&str] = &[
    "indeed.com",
    "linkedin.com",
    "glassdoor.com",
    "remoteok.com",
    "lever.co",
    "greenhouse.io",
];

const CRAWL_RESULT_LIMIT: u32 = 20;
const CRAWL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct CrawlRequest<'a> {
    query: &'a str,
    limit: u32,
}

/// One raw page extract returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlPage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub markdown: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<CrawlPage>,
}

pub struct ManagedCrawlFetcher {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl ManagedCrawlFetcher {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(CRAWL_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
        }
    }
}

/// Composes the provider query: free text plus boolean clauses for location,
/// remote preference, experience level, employment type, and the site
/// allow-list.
pub fn build_crawl_query(query: &str, filters: &SearchFilters) -> String {
    let mut composed = format!("{} jobs", query.trim());

    if let Some(location) = filters.location.as_deref().filter(|l| !l.trim().is_empty()) {
        composed.push_str(&format!(" AND \"{}\"", location.trim()));
    }
    if filters.remote_only {
        composed.push_str(" AND remote");
    }
    if let Some(level) = filters.experience_level {
        composed.push_str(&format!(" AND \"{}\"", level.as_str()));
    }
    if let Some(et) = filters
        .employment_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
    {
        composed.push_str(&format!(" AND \"{}\"", et.trim()));
    }

    let sites: Vec<String> = JOB_BOARD_DOMAINS
        .iter()
        .map(|d| format!("site:{d}"))
        .chain(
            filters
                .extra_domains
                .iter()
                .filter(|d| !d.trim().is_empty())
                .map(|d| format!("site:{}", d.trim())),
        )
        .collect();
    composed.push_str(&format!(" AND ({})", sites.join(" OR ")));

    composed
}

/// Splits a page title of the form "Role at Company", "Role - Company", or
/// "Role | Company" into (role, company). Company falls back to the URL host.
fn split_title_company(title: &str, url: &str) -> (String, String) {
    for sep in [" at ", " - ", " | ", " – "] {
        if let Some((role, company)) = title.split_once(sep) {
            let role = role.trim();
            let company = company.trim();
            if !role.is_empty() && !company.is_empty() {
                return (role.to_string(), company.to_string());
            }
        }
    }
    let host = url
        .split("//")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("unknown")
        .trim_start_matches("www.");
    (title.trim().to_string(), host.to_string())
}

/// Classifies one crawl page and, when accepted, parses it into a posting.
pub fn page_to_posting(page: &CrawlPage) -> Option<JobPosting> {
    let body = page.markdown.as_deref().unwrap_or(&page.description);

    if !is_job_posting_page(&page.url, &page.title, body) {
        return None;
    }

    let (title, company) = split_title_company(&page.title, &page.url);
    if title.is_empty() {
        return None;
    }

    let salary = parse_salary(body);
    let requirements = extract_requirements(body);
    let location = String::new(); // crawl extracts carry no structured location
    let is_remote = detect_remote(&location, &title, body);
    let experience_level = detect_experience_level(&title).or_else(|| detect_experience_level(body));

    Some(JobPosting {
        id: None,
        external_id: None,
        title,
        company,
        location,
        description: body.chars().take(4000).collect(),
        requirements,
        url: page.url.clone(),
        apply_url: None,
        salary_text: salary.text,
        salary_min: salary.min,
        salary_max: salary.max,
        employment_type: None,
        experience_level,
        is_remote,
        source: JobSource::Crawler,
        scraped_at: Utc::now(),
        is_active: true,
    })
}

#[async_trait]
impl SourceFetcher for ManagedCrawlFetcher {
    async fn fetch(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<JobPosting>, FetchError> {
        let api_key = self.api_key.as_deref().ok_or(FetchError::NotConfigured)?;
        let composed = build_crawl_query(query, filters);
        debug!("Managed crawl query: {composed}");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&CrawlRequest {
                query: &composed,
                limit: CRAWL_RESULT_LIMIT,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: CrawlResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        if !body.success {
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message: "provider reported failure".to_string(),
            });
        }

        let postings: Vec<JobPosting> = body.data.iter().filter_map(page_to_posting).collect();
        debug!(
            "Managed crawl returned {} pages, {} accepted as postings",
            body.data.len(),
            postings.len()
        );
        Ok(postings)
    }
}
