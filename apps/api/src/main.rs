mod config;
mod db;
mod discovery;
mod errors;
mod llm_client;
mod models;
mod profile;
mod quota;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::discovery::cache::ResultCache;
use crate::discovery::fetch::boards::DirectScrapeFetcher;
use crate::discovery::fetch::crawl::ManagedCrawlFetcher;
use crate::discovery::fetch::{FallbackFetcher, SourceFetcher};
use crate::discovery::orchestrator::DiscoveryOrchestrator;
use crate::discovery::scoring::{MatchScoreClient, RelevanceScorer};
use crate::llm_client::LlmClient;
use crate::profile::PgProfileService;
use crate::quota::PgQuotaService;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job discovery API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Fetch chain: managed crawl first, direct board scraping as fallback
    let crawl = ManagedCrawlFetcher::new(
        config.crawl_api_url.clone(),
        config.crawl_api_key.clone(),
    );
    if config.crawl_api_key.is_none() {
        info!("CRAWL_API_KEY not set, managed crawl disabled; direct scraping is primary");
    }
    let fetcher: Arc<dyn SourceFetcher> = Arc::new(FallbackFetcher::new(
        Arc::new(crawl),
        Arc::new(DirectScrapeFetcher::default()),
    ));

    // AI scorer is optional; without a key every posting gets the
    // deterministic fallback score
    let score_client: Option<Arc<dyn MatchScoreClient>> = match &config.anthropic_api_key {
        Some(key) => {
            info!("LLM scoring client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(LlmClient::new(key.clone())))
        }
        None => {
            info!("ANTHROPIC_API_KEY not set, using deterministic relevance scoring");
            None
        }
    };

    let orchestrator = Arc::new(DiscoveryOrchestrator::new(
        Arc::new(ResultCache::default()),
        Arc::new(discovery::store::PgJobStore::new(db.clone())),
        fetcher,
        Arc::new(RelevanceScorer::new(score_client)),
        Arc::new(PgQuotaService::new(db.clone(), config.daily_search_limit)),
        Arc::new(PgProfileService::new(db.clone())),
    ));

    let state = AppState {
        db,
        config: config.clone(),
        orchestrator,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
