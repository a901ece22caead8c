use serde::{Deserialize, Serialize};

/// One past position from the candidate's resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub highlights: Option<String>,
}

/// Candidate profile consumed by the relevance scorer.
/// Owned by the profile subsystem; read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
}
