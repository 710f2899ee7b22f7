use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::ai::RecipeGenerator;
use crate::scrapper::RecipeSource;
use crate::search::SearchOrchestrator;
use crate::videos::VideoSource;

pub mod handlers;
pub mod models;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SearchOrchestrator>,
    pub recipes: Arc<dyn RecipeSource>,
    pub videos: Arc<dyn VideoSource>,
    pub generator: Option<Arc<dyn RecipeGenerator>>,
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/search", get(handlers::search_handler))
        .route("/api/recipe", get(handlers::recipe_handler))
        .route(
            "/api/recipes/generate-from-ingredients",
            post(handlers::generate_recipe_handler),
        )
        .route("/api/videos/search", get(handlers::videos_handler))
        .route("/api/health", get(handlers::health_handler))
        .with_state(state)
        .layer(cors)
}
