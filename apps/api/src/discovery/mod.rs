//! The job discovery pipeline: cache → store → fetch chain, persistence of
//! normalized postings, and relevance scoring, coordinated by the
//! orchestrator.

pub mod cache;
pub mod fetch;
pub mod handlers;
pub mod orchestrator;
pub mod scoring;
pub mod store;
