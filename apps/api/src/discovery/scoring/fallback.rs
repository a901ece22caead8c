//! Deterministic relevance fallback: keyword overlap, no LLM call.
//!
//! Used when no AI scorer is configured (all postings) and when an
//! individual AI call fails or times out (that posting only). Pure
//! functions over fixed pattern tables so the scoring rules are testable.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::posting::JobPosting;
use crate::models::profile::CandidateProfile;

/// Technology terms recognized case-insensitively in titles/requirements,
/// in addition to the capitalized-word pattern.
const KNOWN_TECH_TERMS: &[&str] = &[
    "rust",
    "python",
    "java",
    "javascript",
    "typescript",
    "golang",
    "c++",
    "c#",
    "sql",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "kafka",
    "docker",
    "kubernetes",
    "aws",
    "azure",
    "gcp",
    "terraform",
    "react",
    "angular",
    "vue",
    "node.js",
    "graphql",
    "grpc",
    "linux",
    "git",
    "ci/cd",
    "selenium",
    "cypress",
    "playwright",
    "agile",
    "scrum",
];

/// Capitalized words that are grammar, not skills.
const CAPITALIZED_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "for", "with", "you", "we", "our", "your", "in", "on", "at",
    "to", "of", "as", "is", "are", "will", "this", "that", "must", "have",
];

const SKILL_WEIGHT: f64 = 0.7;
const EXPERIENCE_WEIGHT: f64 = 0.3;
const MAX_SUGGESTIONS: usize = 3;

fn capitalized_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][A-Za-z0-9+#./]{2,}\b").expect("capitalized pattern"))
}

/// Result of the deterministic analysis for one posting.
#[derive(Debug, Clone)]
pub struct FallbackAnalysis {
    pub score: u8,
    pub reason: String,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Extracts candidate skill tokens from the posting's title and
/// requirements: capitalized words plus known technology terms, deduplicated
/// case-insensitively in order of first occurrence.
pub fn extract_skill_tokens(posting: &JobPosting) -> Vec<String> {
    let text = format!("{}\n{}", posting.title, posting.requirements.join("\n"));

    let mut seen: HashSet<String> = HashSet::new();
    let mut tokens = Vec::new();

    for m in capitalized_word_re().find_iter(&text) {
        let word = m.as_str();
        let lower = word.to_lowercase();
        if CAPITALIZED_STOPWORDS.contains(&lower.as_str()) {
            continue;
        }
        if seen.insert(lower) {
            tokens.push(word.to_string());
        }
    }

    let lower_text = text.to_lowercase();
    for term in KNOWN_TECH_TERMS {
        if lower_text.contains(term) && seen.insert((*term).to_string()) {
            tokens.push((*term).to_string());
        }
    }

    tokens
}

fn title_words(title: &str) -> Vec<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(str::to_lowercase)
        .collect()
}

/// Experience component: more past positions score higher (capped), with a
/// bonus when any past title textually overlaps the job title.
fn experience_score(profile: &CandidateProfile, posting: &JobPosting) -> u8 {
    let base = (profile.experience.len() as u32 * 20).min(80);

    let job_words = title_words(&posting.title);
    let title_overlap = profile.experience.iter().any(|entry| {
        title_words(&entry.title)
            .iter()
            .any(|w| job_words.contains(w))
    });

    let bonus = if title_overlap { 20 } else { 0 };
    (base + bonus).min(100) as u8
}

fn has_quantified_experience(profile: &CandidateProfile) -> bool {
    profile.experience.iter().any(|entry| {
        entry
            .highlights
            .as_deref()
            .map(|h| h.chars().any(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    })
}

fn build_suggestions(profile: &CandidateProfile, missing: &[String]) -> Vec<String> {
    let mut suggestions = Vec::new();

    // Priority order: missing skills, then summary presence, then
    // quantification advice.
    if !missing.is_empty() {
        let top: Vec<&str> = missing.iter().take(3).map(String::as_str).collect();
        suggestions.push(format!(
            "Highlight experience with {} on your profile",
            top.join(", ")
        ));
    }
    if profile.summary.trim().is_empty() {
        suggestions.push("Add a professional summary to your profile".to_string());
    }
    if !profile.experience.is_empty() && !has_quantified_experience(profile) {
        suggestions.push(
            "Quantify your achievements with concrete numbers (e.g. throughput, users, revenue)"
                .to_string(),
        );
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Computes the deterministic match between one profile and one posting:
/// 70% skill overlap, 30% experience depth, rounded.
pub fn analyze(profile: &CandidateProfile, posting: &JobPosting) -> FallbackAnalysis {
    let tokens = extract_skill_tokens(posting);
    let profile_skills: HashSet<String> =
        profile.skills.iter().map(|s| s.trim().to_lowercase()).collect();

    let mut matched = Vec::new();
    let mut missing = Vec::new();
    for token in &tokens {
        if profile_skills.contains(&token.to_lowercase()) {
            matched.push(token.clone());
        } else {
            missing.push(token.clone());
        }
    }

    // No extractable tokens gives no signal either way; score neutrally.
    let skill_component = if tokens.is_empty() {
        50.0
    } else {
        matched.len() as f64 / tokens.len() as f64 * 100.0
    };
    let experience_component = experience_score(profile, posting) as f64;

    let score = (SKILL_WEIGHT * skill_component + EXPERIENCE_WEIGHT * experience_component)
        .round()
        .clamp(0.0, 100.0) as u8;

    let reason = format!(
        "Matched {} of {} skill keywords from the posting; {} past position(s) on profile",
        matched.len(),
        tokens.len(),
        profile.experience.len()
    );
    let suggestions = build_suggestions(profile, &missing);

    FallbackAnalysis {
        score,
        reason,
        matched,
        missing,
        suggestions,
    }
}
