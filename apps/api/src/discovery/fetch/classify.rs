//! Page classification for crawl results.
//!
//! The managed crawl provider returns arbitrary pages for a query; only
//! pages that look like a single job posting are accepted. Search-results
//! and listing-index pages are rejected up front.

use regex::Regex;
use std::sync::OnceLock;

const SEARCH_MARKERS: &[&str] = &["?q=", "&q=", "keywords=", "query=", "/search", "/find-jobs"];

const HIRING_TERMS: &[&str] = &[
    "apply now",
    "apply for this",
    "we're hiring",
    "job description",
    "responsibilities",
    "qualifications",
    "what you'll do",
    "about the role",
];

fn job_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)/(jobs?|careers?|positions?|vacanc(?:y|ies)|openings?|postings?)([/\-_]|$)")
            .expect("job path pattern")
    })
}

/// True for search-results or listing-index URLs, which are never a single posting.
pub fn is_search_results_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    SEARCH_MARKERS.iter().any(|m| lower.contains(m))
}

fn contains_hiring_terms(text: &str) -> bool {
    let lower = text.to_lowercase();
    HIRING_TERMS.iter().any(|t| lower.contains(t))
}

/// Accepts a page as a single job-posting page.
///
/// A page qualifies when its URL is not a search-results URL AND either the
/// URL matches a job/career path pattern or the title/content carries
/// hiring-related terms.
pub fn is_job_posting_page(url: &str, title: &str, content: &str) -> bool {
    if is_search_results_url(url) {
        return false;
    }
    job_path_re().is_match(url) || contains_hiring_terms(title) || contains_hiring_terms(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_query_string_search_urls() {
        assert!(is_search_results_url("https://indeed.com/jobs?q=rust&l=berlin"));
        assert!(is_search_results_url("https://example.com/find-jobs/rust"));
        assert!(is_search_results_url("https://example.com/search?term=rust"));
    }

    #[test]
    fn test_plain_posting_url_is_not_search() {
        assert!(!is_search_results_url("https://acme.example/careers/senior-rust-engineer"));
    }

    #[test]
    fn test_accepts_job_path_urls() {
        assert!(is_job_posting_page(
            "https://acme.example/careers/senior-rust-engineer",
            "",
            ""
        ));
        assert!(is_job_posting_page("https://boards.example/jobs/12345", "", ""));
        assert!(is_job_posting_page("https://acme.example/vacancy/tester", "", ""));
    }

    #[test]
    fn test_accepts_hiring_terms_in_title_or_content() {
        assert!(is_job_posting_page(
            "https://acme.example/p/42",
            "Acme — we're hiring",
            ""
        ));
        assert!(is_job_posting_page(
            "https://acme.example/p/42",
            "Acme",
            "Responsibilities: build things. Qualifications: Rust."
        ));
    }

    #[test]
    fn test_rejects_unrecognizable_pages() {
        assert!(!is_job_posting_page(
            "https://acme.example/blog/rust-at-acme",
            "Rust at Acme",
            "A story about our stack."
        ));
    }

    #[test]
    fn test_search_url_rejected_even_with_hiring_terms() {
        assert!(!is_job_posting_page(
            "https://indeed.com/jobs?q=rust",
            "Apply now",
            "job description"
        ));
    }
}
