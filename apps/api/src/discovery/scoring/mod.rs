//! Relevance scoring: AI-backed with a deterministic per-item fallback.
//!
//! Scoring never fails a batch: a bad call degrades that single posting to
//! the fallback score. Only a bounded prefix of the batch is sent to the AI
//! scorer; the remainder stays unscored (absent, not zero).

pub mod fallback;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::warn;

use crate::models::posting::{JobPosting, ScoredPosting};
use crate::models::profile::CandidateProfile;

/// How many postings from the head of a batch get an AI scoring call.
pub const SCORED_PREFIX: usize = 10;
/// Per-call timeout for one AI scoring request.
pub const SCORE_CALL_TIMEOUT: Duration = Duration::from_secs(10);
/// Dispatch stagger: call `i` starts `i × STAGGER` after the batch begins,
/// smoothing burst load against the provider's rate limit.
pub const SCORE_STAGGER: Duration = Duration::from_millis(100);

const NEUTRAL_SCORE: u8 = 50;

/// The raw AI scoring call: resume summary and job summary in, a short
/// numeric-string reply out. One implementation wraps the Anthropic API;
/// tests substitute their own.
#[async_trait]
pub trait MatchScoreClient: Send + Sync {
    async fn rate_match(&self, resume_summary: &str, job_summary: &str)
        -> anyhow::Result<String>;
}

/// Parses the AI reply. Unparsable replies become the neutral default
/// rather than an error; parsed values are clamped into [0, 100].
pub fn parse_score(text: &str) -> u8 {
    match text.trim().parse::<i64>() {
        Ok(value) => value.clamp(0, 100) as u8,
        Err(_) => NEUTRAL_SCORE,
    }
}

/// Orders a batch for presentation: scored postings first, sorted strictly
/// descending by score (stable on ties), then unscored postings in their
/// original relative order.
pub fn merge_and_sort(batch: Vec<ScoredPosting>) -> Vec<ScoredPosting> {
    let mut scored = Vec::new();
    let mut unscored = Vec::new();
    for item in batch {
        if item.match_score.is_some() {
            scored.push(item);
        } else {
            unscored.push(item);
        }
    }
    scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    scored.extend(unscored);
    scored
}

/// Condenses a profile into the resume summary sent to the scorer.
pub fn resume_summary(profile: &CandidateProfile) -> String {
    let positions: Vec<&str> = profile
        .experience
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    format!(
        "{}\nSkills: {}\nPast positions: {}",
        profile.summary,
        profile.skills.join(", "),
        positions.join(", ")
    )
}

/// Condenses a posting into the job summary sent to the scorer.
pub fn job_summary(posting: &JobPosting) -> String {
    let description: String = posting.description.chars().take(800).collect();
    format!(
        "{} at {}\nRequirements: {}\n{}",
        posting.title,
        posting.company,
        posting.requirements.join("; "),
        description
    )
}

pub struct RelevanceScorer {
    client: Option<Arc<dyn MatchScoreClient>>,
    scored_prefix: usize,
    call_timeout: Duration,
    stagger: Duration,
}

impl RelevanceScorer {
    pub fn new(client: Option<Arc<dyn MatchScoreClient>>) -> Self {
        Self {
            client,
            scored_prefix: SCORED_PREFIX,
            call_timeout: SCORE_CALL_TIMEOUT,
            stagger: SCORE_STAGGER,
        }
    }

    /// Scores a batch for one candidate. Never fails: per-item problems
    /// degrade to the deterministic fallback score for that item only.
    ///
    /// With an AI client, the first `scored_prefix` postings get one AI
    /// call each; the remainder stays unscored. Without a client, every
    /// posting gets the deterministic fallback score.
    pub async fn score_batch(
        &self,
        profile: &CandidateProfile,
        postings: Vec<JobPosting>,
    ) -> Vec<ScoredPosting> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => {
                let all_scored = postings
                    .into_iter()
                    .map(|posting| scored_with(profile, posting, None))
                    .collect();
                return merge_and_sort(all_scored);
            }
        };

        let prefix_len = self.scored_prefix.min(postings.len());
        let resume = Arc::new(resume_summary(profile));

        let mut join_set = JoinSet::new();
        for (index, posting) in postings.iter().take(prefix_len).enumerate() {
            let client = client.clone();
            let resume = resume.clone();
            let job = job_summary(posting);
            let stagger = self.stagger * index as u32;
            let call_timeout = self.call_timeout;

            join_set.spawn(async move {
                tokio::time::sleep(stagger).await;
                let outcome =
                    tokio::time::timeout(call_timeout, client.rate_match(&resume, &job)).await;
                let score = match outcome {
                    Ok(Ok(reply)) => Some(parse_score(&reply)),
                    Ok(Err(e)) => {
                        warn!("AI scoring call {index} failed, using fallback: {e}");
                        None
                    }
                    Err(_) => {
                        warn!("AI scoring call {index} timed out, using fallback");
                        None
                    }
                };
                (index, score)
            });
        }

        let mut ai_scores: Vec<Option<u8>> = vec![None; prefix_len];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, score)) => ai_scores[index] = score,
                Err(e) => warn!("AI scoring task panicked: {e}"),
            }
        }

        let mut batch = Vec::with_capacity(postings.len());
        for (index, posting) in postings.into_iter().enumerate() {
            if index < prefix_len {
                batch.push(scored_with(profile, posting, ai_scores[index]));
            } else {
                batch.push(ScoredPosting::unscored(posting));
            }
        }
        merge_and_sort(batch)
    }
}

/// Builds a scored posting from the deterministic analysis, overriding the
/// score with the AI value when one arrived.
fn scored_with(
    profile: &CandidateProfile,
    posting: JobPosting,
    ai_score: Option<u8>,
) -> ScoredPosting {
    let analysis = fallback::analyze(profile, &posting);
    ScoredPosting {
        posting,
        match_score: Some(ai_score.unwrap_or(analysis.score)),
        match_reason: analysis.reason,
        key_skill_matches: analysis.matched,
        missing_skills: analysis.missing,
        improvement_suggestions: analysis.suggestions,
    }
}
