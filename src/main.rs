use std::sync::Arc;

use skillet::ai::{GeminiClient, QueryRefiner, RecipeGenerator};
use skillet::api::{AppState, create_router};
use skillet::cache::MemoryCache;
use skillet::config::CONFIG;
use skillet::scrapper::{AllrecipesScraper, RecipeSource};
use skillet::search::{SearchConfig, SearchOrchestrator};
use skillet::videos::{VideoSource, YoutubeScraper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber. Its default tracing-log feature already
    // installs the log crate bridge here, so log::warn! etc. in the adapters
    // come through without a separate LogTracer::init.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let cache = Arc::new(MemoryCache::new());
    let recipes: Arc<dyn RecipeSource> = Arc::new(AllrecipesScraper::new(
        CONFIG.recipe_base_url.clone(),
        &CONFIG.user_agent,
        CONFIG.scrape_concurrency,
    )?);
    let videos: Arc<dyn VideoSource> = Arc::new(YoutubeScraper::new(
        CONFIG.youtube_base_url.clone(),
        &CONFIG.user_agent,
    )?);

    let gemini: Option<Arc<GeminiClient>> = match &CONFIG.gemini_api_key {
        Some(key) => {
            tracing::info!("AI features enabled (model: {})", CONFIG.gemini_model);
            Some(Arc::new(GeminiClient::new(
                key.clone(),
                CONFIG.gemini_model.clone(),
            )?))
        }
        None => {
            tracing::info!("GEMINI_API_KEY not set, searching with raw queries");
            None
        }
    };
    let refiner: Option<Arc<dyn QueryRefiner>> =
        gemini.as_ref().map(|g| Arc::clone(g) as Arc<dyn QueryRefiner>);
    let generator: Option<Arc<dyn RecipeGenerator>> =
        gemini.map(|g| g as Arc<dyn RecipeGenerator>);

    let orchestrator = Arc::new(SearchOrchestrator::new(
        cache,
        Arc::clone(&recipes),
        Arc::clone(&videos),
        refiner,
        SearchConfig {
            cache_ttl: CONFIG.cache_ttl,
            overall_timeout: CONFIG.search_timeout,
            ai_timeout: CONFIG.ai_timeout,
            video_timeout: CONFIG.video_timeout,
            video_concurrency: CONFIG.video_concurrency,
            ..SearchConfig::default()
        },
    ));

    let app = create_router(AppState {
        orchestrator,
        recipes,
        videos,
        generator,
    });

    let listener = tokio::net::TcpListener::bind(&CONFIG.bind_addr).await?;
    tracing::info!("listening on {}", CONFIG.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
