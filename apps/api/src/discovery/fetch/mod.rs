//! Source fetchers: "get fresh postings for a query".
//!
//! Two strategies composed as an ordered fallback chain (not a race):
//! the managed crawl provider first, direct board scraping second. A
//! strategy either returns a (possibly empty) posting list or fails with
//! `FetchError`, never a mix. An empty crawl success is a final answer
//! and does not trigger the scrape fallback: "source unavailable" and
//! "source available but nothing matched" are different outcomes.

pub mod boards;
pub mod classify;
pub mod crawl;
pub mod parse;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::models::posting::{JobPosting, SearchFilters};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("crawl provider is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("all job boards failed: {0}")]
    AllBoardsFailed(String),
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<JobPosting>, FetchError>;
}

/// Ordered fallback chain over two fetch strategies.
pub struct FallbackFetcher {
    primary: Arc<dyn SourceFetcher>,
    fallback: Arc<dyn SourceFetcher>,
}

impl FallbackFetcher {
    pub fn new(primary: Arc<dyn SourceFetcher>, fallback: Arc<dyn SourceFetcher>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl SourceFetcher for FallbackFetcher {
    async fn fetch(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<JobPosting>, FetchError> {
        match self.primary.fetch(query, filters).await {
            Ok(postings) => Ok(postings),
            Err(e) => {
                warn!("Primary fetch strategy failed, falling back to direct scrape: {e}");
                self.fallback.fetch(query, filters).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::posting::JobSource;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn posting(title: &str) -> JobPosting {
        JobPosting {
            id: None,
            external_id: None,
            title: title.to_string(),
            company: "Acme".to_string(),
            location: String::new(),
            description: String::new(),
            requirements: vec![],
            url: format!("https://example.com/jobs/{title}"),
            apply_url: None,
            salary_text: None,
            salary_min: None,
            salary_max: None,
            employment_type: None,
            experience_level: None,
            is_remote: false,
            source: JobSource::Indeed,
            scraped_at: Utc::now(),
            is_active: true,
        }
    }

    struct CountingFetcher {
        calls: AtomicUsize,
        result: Box<dyn Fn() -> Result<Vec<JobPosting>, FetchError> + Send + Sync>,
    }

    impl CountingFetcher {
        fn new(
            result: impl Fn() -> Result<Vec<JobPosting>, FetchError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Box::new(result),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceFetcher for CountingFetcher {
        async fn fetch(
            &self,
            _query: &str,
            _filters: &SearchFilters,
        ) -> Result<Vec<JobPosting>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = CountingFetcher::new(|| Ok(vec![posting("a")]));
        let fallback = CountingFetcher::new(|| Ok(vec![posting("b")]));
        let chain = FallbackFetcher::new(primary.clone(), fallback.clone());

        let out = chain.fetch("rust", &SearchFilters::default()).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "a");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_empty_success_is_final() {
        // Zero results from a healthy primary must NOT trigger the fallback.
        let primary = CountingFetcher::new(|| Ok(vec![]));
        let fallback = CountingFetcher::new(|| Ok(vec![posting("b")]));
        let chain = FallbackFetcher::new(primary.clone(), fallback.clone());

        let out = chain.fetch("rust", &SearchFilters::default()).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_triggers_fallback() {
        let primary = CountingFetcher::new(|| Err(FetchError::NotConfigured));
        let fallback = CountingFetcher::new(|| Ok(vec![posting("b"), posting("c")]));
        let chain = FallbackFetcher::new(primary.clone(), fallback.clone());

        let out = chain.fetch("rust", &SearchFilters::default()).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_failing_surfaces_fallback_error() {
        let primary = CountingFetcher::new(|| Err(FetchError::NotConfigured));
        let fallback = CountingFetcher::new(|| {
            Err(FetchError::AllBoardsFailed("2 boards errored".to_string()))
        });
        let chain = FallbackFetcher::new(primary, fallback);

        let err = chain
            .fetch("rust", &SearchFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::AllBoardsFailed(_)));
    }
}
