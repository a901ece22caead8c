//! Field-level parsing heuristics shared by both fetch strategies.
//!
//! Pure functions over fixed pattern tables so their precedence rules are
//! independently verifiable (salary bounds, remote detection, seniority).

use regex::Regex;
use std::sync::OnceLock;

use crate::models::posting::ExperienceLevel;

/// Seniority markers in precedence order: senior terms are checked before
/// junior terms before mid-level terms; the first match wins.
const SENIOR_MARKERS: &[&str] = &["senior", "sr.", "staff engineer", "principal", "lead "];
const JUNIOR_MARKERS: &[&str] = &[
    "junior",
    "jr.",
    "entry level",
    "entry-level",
    "graduate",
    "internship",
];
const MID_MARKERS: &[&str] = &["mid-level", "mid level", "intermediate"];

const REMOTE_MARKERS: &[&str] = &["remote", "work from home", "wfh", "anywhere", "distributed team"];

/// Parsed salary bounds plus the matched text they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalaryBounds {
    pub text: Option<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

fn salary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:[$€£]|usd|eur|gbp)\s*([0-9][0-9,.]*)\s*(k)?(?:\s*(?:-|–|—|to)\s*(?:[$€£]|usd|eur|gbp)?\s*([0-9][0-9,.]*)\s*(k)?)?",
        )
        .expect("salary pattern")
    })
}

fn parse_amount(raw: &str, k_suffix: bool) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    let value: f64 = cleaned.trim_end_matches('.').parse().ok()?;
    let value = if k_suffix { value * 1000.0 } else { value };
    Some(value.round() as i64)
}

/// Extracts salary bounds from the first currency-like substring in `text`.
/// A single numeric group fills `min` and leaves `max` absent; two groups are
/// ordered so `min <= max` holds regardless of how the source wrote them.
pub fn parse_salary(text: &str) -> SalaryBounds {
    let caps = match salary_re().captures(text) {
        Some(c) => c,
        None => return SalaryBounds::default(),
    };

    let matched = caps.get(0).map(|m| m.as_str().trim().to_string());
    let first = caps
        .get(1)
        .and_then(|m| parse_amount(m.as_str(), caps.get(2).is_some()));
    let second = caps
        .get(3)
        .and_then(|m| parse_amount(m.as_str(), caps.get(4).is_some()));

    let (min, max) = match (first, second) {
        (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
        (a, b) => (a, b),
    };

    SalaryBounds {
        text: matched,
        min,
        max,
    }
}

/// True when location, title, or body text carries a remote indicator.
pub fn detect_remote(location: &str, title: &str, body: &str) -> bool {
    [location, title, body].iter().any(|text| {
        let lower = text.to_lowercase();
        REMOTE_MARKERS.iter().any(|m| lower.contains(m))
    })
}

/// Infers the seniority band from free text. Fixed precedence: senior
/// markers first, then junior, then mid-level; absent any match the level
/// stays unset.
pub fn detect_experience_level(text: &str) -> Option<ExperienceLevel> {
    let lower = text.to_lowercase();
    if SENIOR_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(ExperienceLevel::Senior);
    }
    if JUNIOR_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(ExperienceLevel::Junior);
    }
    if MID_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(ExperienceLevel::MidLevel);
    }
    None
}

/// Pulls requirement-looking lines out of a posting body: bullet lines and
/// lines under a requirements/qualifications heading. Best effort, capped.
pub fn extract_requirements(body: &str) -> Vec<String> {
    const MAX_REQUIREMENTS: usize = 12;

    let mut requirements = Vec::new();
    let mut in_requirements_block = false;

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let lower = trimmed.to_lowercase();
        if lower.starts_with("requirements") || lower.starts_with("qualifications") {
            in_requirements_block = true;
            continue;
        }

        let bullet = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
            .or_else(|| trimmed.strip_prefix("• "));

        match bullet {
            Some(rest) if rest.len() >= 4 => {
                requirements.push(rest.trim().to_string());
                in_requirements_block = false;
            }
            Some(_) => in_requirements_block = false,
            None if in_requirements_block && trimmed.len() >= 4 => {
                requirements.push(trimmed.to_string());
                in_requirements_block = false;
            }
            None => {}
        }

        if requirements.len() >= MAX_REQUIREMENTS {
            break;
        }
    }

    requirements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salary_range_with_commas() {
        let s = parse_salary("Compensation: $120,000 - $150,000 per year");
        assert_eq!(s.min, Some(120_000));
        assert_eq!(s.max, Some(150_000));
        assert_eq!(s.text.as_deref(), Some("$120,000 - $150,000"));
    }

    #[test]
    fn test_salary_k_suffix_range() {
        let s = parse_salary("We pay €90k–€110k depending on experience");
        assert_eq!(s.min, Some(90_000));
        assert_eq!(s.max, Some(110_000));
    }

    #[test]
    fn test_salary_single_amount() {
        let s = parse_salary("Base salary USD 95,500");
        assert_eq!(s.min, Some(95_500));
        assert_eq!(s.max, None);
    }

    #[test]
    fn test_salary_reversed_range_is_reordered() {
        let s = parse_salary("$150k to $120k");
        assert_eq!(s.min, Some(120_000));
        assert_eq!(s.max, Some(150_000));
    }

    #[test]
    fn test_no_currency_no_salary() {
        let s = parse_salary("Competitive salary, 25 vacation days");
        assert_eq!(s, SalaryBounds::default());
    }

    #[test]
    fn test_detect_remote_from_each_field() {
        assert!(detect_remote("Remote (EU)", "", ""));
        assert!(detect_remote("", "Rust Engineer — fully remote", ""));
        assert!(detect_remote("", "", "You can work from home."));
        assert!(!detect_remote("Berlin", "Rust Engineer", "On-site role."));
    }

    #[test]
    fn test_experience_senior_beats_junior_mentions() {
        // A senior role that mentions mentoring juniors is still senior.
        let level = detect_experience_level("Senior engineer mentoring junior developers");
        assert_eq!(level, Some(ExperienceLevel::Senior));
    }

    #[test]
    fn test_experience_junior_beats_mid() {
        let level = detect_experience_level("Entry level role, intermediate SQL useful");
        assert_eq!(level, Some(ExperienceLevel::Junior));
    }

    #[test]
    fn test_experience_mid_level() {
        assert_eq!(
            detect_experience_level("Looking for a mid-level backend developer"),
            Some(ExperienceLevel::MidLevel)
        );
    }

    #[test]
    fn test_experience_absent_without_markers() {
        assert_eq!(detect_experience_level("Backend developer, Rust"), None);
    }

    #[test]
    fn test_extract_requirements_bullets_and_heading() {
        let body = "About us\n\nRequirements:\n- 5 years of Rust\n- Postgres experience\n* CI/CD pipelines\nBenefits\n";
        let reqs = extract_requirements(body);
        assert_eq!(
            reqs,
            vec![
                "5 years of Rust".to_string(),
                "Postgres experience".to_string(),
                "CI/CD pipelines".to_string()
            ]
        );
    }

    #[test]
    fn test_extract_requirements_capped() {
        let body: String = (0..30).map(|i| format!("- requirement number {i}\n")).collect();
        assert_eq!(extract_requirements(&body).len(), 12);
    }
}
