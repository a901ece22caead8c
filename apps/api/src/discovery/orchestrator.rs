//! Discovery orchestrator: the top-level search coordinator.
//!
//! Consults cache → store → fetch chain in order of increasing cost,
//! persists new results, scores them for the requesting candidate when a
//! profile exists, and returns a merged, deterministically ordered list.
//! Only canonical (unscored) postings are cached: scores are
//! profile-specific and must never leak between users sharing a query.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::cache::ResultCache;
use crate::discovery::fetch::{FetchError, SourceFetcher};
use crate::discovery::scoring::RelevanceScorer;
use crate::discovery::store::JobStore;
use crate::errors::AppError;
use crate::models::posting::{JobPosting, ScoredPosting, SearchFilters};
use crate::profile::ProfileService;
use crate::quota::QuotaService;

/// Below this many recent stored results, a fresh fetch is triggered even
/// though some results exist; balances freshness against fetching on
/// every request.
pub const MIN_RECENT_RESULTS: usize = 5;
/// How far back a stored posting still counts as "recent".
pub const RECENT_WINDOW_HOURS: i64 = 24;
/// Upper bound on postings returned per search.
pub const RESULT_LIMIT: i64 = 50;

#[derive(Debug)]
pub struct DiscoveryOutcome {
    pub jobs: Vec<ScoredPosting>,
    pub from_cache: bool,
}

pub struct DiscoveryOrchestrator {
    cache: Arc<ResultCache>,
    store: Arc<dyn JobStore>,
    fetcher: Arc<dyn SourceFetcher>,
    scorer: Arc<RelevanceScorer>,
    quota: Arc<dyn QuotaService>,
    profiles: Arc<dyn ProfileService>,
}

impl DiscoveryOrchestrator {
    pub fn new(
        cache: Arc<ResultCache>,
        store: Arc<dyn JobStore>,
        fetcher: Arc<dyn SourceFetcher>,
        scorer: Arc<RelevanceScorer>,
        quota: Arc<dyn QuotaService>,
        profiles: Arc<dyn ProfileService>,
    ) -> Self {
        Self {
            cache,
            store,
            fetcher,
            scorer,
            quota,
            profiles,
        }
    }

    /// Runs one discovery search end to end.
    ///
    /// Validation and the quota check run before any cache/store/fetch
    /// work; a rejected caller causes zero pipeline side effects.
    pub async fn discover_jobs(
        &self,
        user_id: Option<Uuid>,
        query: &str,
        location: Option<&str>,
        filters: &SearchFilters,
    ) -> Result<DiscoveryOutcome, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidQuery("query text is required".to_string()));
        }

        if let Some(uid) = user_id {
            if !self.quota.is_search_allowed(uid).await? {
                return Err(AppError::QuotaExceeded);
            }
        }

        // Cache lookup: a hit skips all store/fetch work; the canonical
        // list is still scored for this caller.
        if let Some(cached) = self.cache.get(query, location) {
            debug!("Cache hit for query '{query}'");
            let jobs = self.score_for(user_id, cached).await;
            self.record_usage(user_id, query, location, jobs.len());
            return Ok(DiscoveryOutcome {
                jobs,
                from_cache: true,
            });
        }

        // Store lookup: a healthy recent set avoids a fetch entirely.
        let since = Utc::now() - ChronoDuration::hours(RECENT_WINDOW_HOURS);
        let recent = self.store.find_recent_active(since, RESULT_LIMIT).await?;

        let postings = if recent.len() >= MIN_RECENT_RESULTS {
            debug!("Store lookup satisfied query '{query}' with {} postings", recent.len());
            recent
        } else {
            match self.fetch_and_persist(query, filters).await {
                Ok(Ok(())) => {
                    // Re-read so results carry store ids and dedupe applies.
                    self.store.find_recent_active(since, RESULT_LIMIT).await?
                }
                Ok(Err(e)) if !recent.is_empty() => {
                    // Degraded: serve the stale-ish results we already know.
                    warn!("Fetch failed for query '{query}', serving {} known postings: {e}", recent.len());
                    recent
                }
                Ok(Err(e)) => {
                    warn!("Fetch failed for query '{query}' with no known results: {e}");
                    return Err(AppError::SourceUnavailable);
                }
                Err(e) if !recent.is_empty() => {
                    warn!("Fetch task did not complete, serving {} known postings: {e}", recent.len());
                    recent
                }
                Err(e) => {
                    warn!("Fetch task did not complete for query '{query}': {e}");
                    return Err(AppError::SourceUnavailable);
                }
            }
        };

        let jobs = self.score_for(user_id, postings.clone()).await;
        self.cache.set(query, location, postings);
        self.record_usage(user_id, query, location, jobs.len());

        Ok(DiscoveryOutcome {
            jobs,
            from_cache: false,
        })
    }

    /// Fetches fresh postings and upserts them on a detached task, so
    /// discovered postings are kept even when the caller abandons the
    /// request mid-flight. Per-posting persistence failures are logged
    /// and skipped; one bad row never aborts the rest.
    fn fetch_and_persist(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> tokio::task::JoinHandle<Result<(), FetchError>> {
        let fetcher = self.fetcher.clone();
        let store = self.store.clone();
        let query = query.to_string();
        let filters = filters.clone();

        tokio::spawn(async move {
            let fresh = fetcher.fetch(&query, &filters).await?;
            info!("Fetched {} fresh postings for query '{query}'", fresh.len());
            for posting in &fresh {
                if let Err(e) = store.upsert_by_identity(posting).await {
                    warn!(
                        "Failed to persist posting '{}' from {:?}: {e}",
                        posting.title, posting.source
                    );
                }
            }
            Ok(())
        })
    }

    /// Scores the batch when the caller has a profile; otherwise returns
    /// the postings unscored in their original order.
    async fn score_for(&self, user_id: Option<Uuid>, postings: Vec<JobPosting>) -> Vec<ScoredPosting> {
        let profile = match user_id {
            Some(uid) => match self.profiles.candidate_profile(uid).await {
                Ok(profile) => profile,
                Err(e) => {
                    warn!("Profile lookup failed, returning unscored results: {e}");
                    None
                }
            },
            None => None,
        };

        match profile {
            Some(profile) => self.scorer.score_batch(&profile, postings).await,
            None => postings.into_iter().map(ScoredPosting::unscored).collect(),
        }
    }

    /// Telemetry and quota accounting, detached from the response path.
    /// Failures here must not fail a search that already succeeded.
    fn record_usage(&self, user_id: Option<Uuid>, query: &str, location: Option<&str>, count: usize) {
        let store = self.store.clone();
        let quota = self.quota.clone();
        let query = query.to_string();
        let location = location.map(str::to_string);

        tokio::spawn(async move {
            if let Err(e) = store
                .record_search(user_id, &query, location.as_deref(), count as i64)
                .await
            {
                warn!("record_search failed: {e}");
            }
            if let Some(uid) = user_id {
                if let Err(e) = quota.record_search_used(uid).await {
                    warn!("record_search_used failed: {e}");
                }
            }
        });
    }
}
