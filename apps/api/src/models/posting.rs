use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seniority band inferred from a posting's text. Absent when no marker matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExperienceLevel {
    Junior,
    MidLevel,
    Senior,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::MidLevel => "mid-level",
            ExperienceLevel::Senior => "senior",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "junior" => Some(ExperienceLevel::Junior),
            "mid-level" => Some(ExperienceLevel::MidLevel),
            "senior" => Some(ExperienceLevel::Senior),
            _ => None,
        }
    }
}

/// Where a posting was discovered. Stored alongside the posting so callers
/// can tell crawl-provider results from directly scraped boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSource {
    Crawler,
    Indeed,
    RemoteOk,
    Glassdoor,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::Crawler => "crawler",
            JobSource::Indeed => "indeed",
            JobSource::RemoteOk => "remote_ok",
            JobSource::Glassdoor => "glassdoor",
        }
    }

    /// Stored as TEXT; unknown tags fall back to `Crawler` rather than
    /// failing the whole row read.
    pub fn parse(s: &str) -> Self {
        match s {
            "indeed" => JobSource::Indeed,
            "remote_ok" => JobSource::RemoteOk,
            "glassdoor" => JobSource::Glassdoor,
            _ => JobSource::Crawler,
        }
    }
}

/// A normalized job listing. Produced by the fetchers, persisted by the
/// job store, and handed to the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    /// Database id, assigned on upsert. `None` for freshly scraped postings.
    pub id: Option<Uuid>,
    /// Stable id from the source site, when it provides one.
    pub external_id: Option<String>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub url: String,
    pub apply_url: Option<String>,
    pub salary_text: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub employment_type: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub is_remote: bool,
    pub source: JobSource,
    pub scraped_at: DateTime<Utc>,
    pub is_active: bool,
}

impl JobPosting {
    /// The deduplication key: the source's stable id when present,
    /// otherwise the composite key.
    pub fn identity(&self) -> String {
        match self.external_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => self.composite_identity(),
        }
    }

    /// The composite fallback key over title, company, and url. Stores use
    /// it to recognize a previously seen posting whose stable id only
    /// appeared on a later discovery.
    pub fn composite_identity(&self) -> String {
        format!(
            "{}|{}|{}",
            self.title.trim().to_lowercase(),
            self.company.trim().to_lowercase(),
            self.url.trim()
        )
    }
}

/// Caller-supplied constraints forwarded into the fetch chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub location: Option<String>,
    #[serde(default)]
    pub remote_only: bool,
    pub experience_level: Option<ExperienceLevel>,
    pub employment_type: Option<String>,
    /// Extra domains appended to the crawl allow-list.
    #[serde(default)]
    pub extra_domains: Vec<String>,
}

/// A posting augmented with relevance data for one candidate.
/// Transient; scores are profile-specific and never persisted or cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPosting {
    #[serde(flatten)]
    pub posting: JobPosting,
    /// 0–100, or `None` for postings outside the scored prefix.
    pub match_score: Option<u8>,
    pub match_reason: String,
    pub key_skill_matches: Vec<String>,
    pub missing_skills: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

impl ScoredPosting {
    /// Wraps a posting that was not selected for scoring.
    pub fn unscored(posting: JobPosting) -> Self {
        Self {
            posting,
            match_score: None,
            match_reason: String::new(),
            key_skill_matches: vec![],
            missing_skills: vec![],
            improvement_suggestions: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(external_id: Option<&str>) -> JobPosting {
        JobPosting {
            id: None,
            external_id: external_id.map(str::to_string),
            title: "Senior Rust Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Berlin".to_string(),
            description: String::new(),
            requirements: vec![],
            url: "https://acme.example/jobs/42".to_string(),
            apply_url: None,
            salary_text: None,
            salary_min: None,
            salary_max: None,
            employment_type: None,
            experience_level: None,
            is_remote: false,
            source: JobSource::Crawler,
            scraped_at: Utc::now(),
            is_active: true,
        }
    }

    #[test]
    fn test_identity_prefers_external_id() {
        let p = posting(Some("ext-123"));
        assert_eq!(p.identity(), "ext-123");
    }

    #[test]
    fn test_identity_falls_back_to_composite() {
        let p = posting(None);
        assert_eq!(
            p.identity(),
            "senior rust engineer|acme|https://acme.example/jobs/42"
        );
    }

    #[test]
    fn test_identity_ignores_blank_external_id() {
        let p = posting(Some("  "));
        assert!(p.identity().contains('|'));
    }

    #[test]
    fn test_composite_identity_unaffected_by_external_id() {
        let with_id = posting(Some("ext-123"));
        let without_id = posting(None);
        assert_eq!(with_id.composite_identity(), without_id.composite_identity());
        assert_eq!(without_id.identity(), without_id.composite_identity());
    }

    #[test]
    fn test_identity_stable_across_title_casing() {
        let mut a = posting(None);
        let mut b = posting(None);
        a.title = "Senior Rust Engineer".to_string();
        b.title = "SENIOR RUST ENGINEER".to_string();
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_experience_level_round_trip() {
        for level in [
            ExperienceLevel::Junior,
            ExperienceLevel::MidLevel,
            ExperienceLevel::Senior,
        ] {
            assert_eq!(ExperienceLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(ExperienceLevel::parse("wizard"), None);
    }

    #[test]
    fn test_job_source_parse_unknown_defaults_to_crawler() {
        assert_eq!(JobSource::parse("indeed"), JobSource::Indeed);
        assert_eq!(JobSource::parse("monster"), JobSource::Crawler);
    }
}
