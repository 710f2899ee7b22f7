use std::time::Instant;

use axum::{Json, extract::Query, extract::State, http::StatusCode};
use chrono::Utc;

use crate::data_models::SearchResponse;
use crate::search::SearchError;

use super::AppState;
use super::models::{
    GenerateRecipeRequest, GenerateRecipeResponse, HealthResponse, RecipeDetailResponse,
    RecipeParams, SearchParams, VideoSearchParams, VideoSearchResponse,
};

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let query = params.into_query();
    let response = state
        .orchestrator
        .search(&query)
        .await
        .map_err(error_response)?;
    Ok(Json(response))
}

fn error_response(err: SearchError) -> (StatusCode, String) {
    let status = match &err {
        SearchError::Validation(_) => StatusCode::BAD_REQUEST,
        SearchError::Upstream(_) => StatusCode::BAD_GATEWAY,
        SearchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    };
    (status, err.to_string())
}

pub async fn recipe_handler(
    State(state): State<AppState>,
    Query(params): Query<RecipeParams>,
) -> Result<Json<RecipeDetailResponse>, (StatusCode, String)> {
    let start = Instant::now();
    let url = params.url.trim();
    if url.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "url must not be empty".to_string()));
    }

    let mut recipe = state
        .recipes
        .fetch(url)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("Scrape error: {e:#}")))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("No recipe found at {url}"),
            )
        })?;

    let mut video_tutorials = Vec::new();
    if params.include_videos.unwrap_or(true) {
        match state.videos.search_videos(&recipe.title, 3).await {
            Ok(found) => {
                if let Some(first) = found.first() {
                    recipe.video_url = Some(first.url.clone());
                }
                video_tutorials = found;
            }
            Err(e) => log::warn!("video lookup failed for '{}': {:#}", recipe.title, e),
        }
    }

    Ok(Json(RecipeDetailResponse {
        recipe,
        processing_time: start.elapsed().as_secs_f64(),
        video_tutorials,
    }))
}

pub async fn generate_recipe_handler(
    State(state): State<AppState>,
    Json(req): Json<GenerateRecipeRequest>,
) -> Result<Json<GenerateRecipeResponse>, (StatusCode, String)> {
    let Some(generator) = &state.generator else {
        return Err((
            StatusCode::NOT_IMPLEMENTED,
            "AI features are disabled (no API key configured)".to_string(),
        ));
    };

    let ingredients: Vec<String> = req
        .ingredients
        .iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    if ingredients.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "ingredients must not be empty".to_string(),
        ));
    }

    let generated_recipe = generator
        .generate_recipe(&ingredients)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("AI error: {e:#}")))?;

    Ok(Json(GenerateRecipeResponse {
        generated_recipe,
        ingredients_used: ingredients,
    }))
}

pub async fn videos_handler(
    State(state): State<AppState>,
    Query(params): Query<VideoSearchParams>,
) -> Result<Json<VideoSearchResponse>, (StatusCode, String)> {
    if params.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    let max_results = params.max_results.unwrap_or(10);
    if !(1..=20).contains(&max_results) {
        return Err((
            StatusCode::BAD_REQUEST,
            "max_results must be between 1 and 20".to_string(),
        ));
    }

    let videos = state
        .videos
        .search_videos(params.query.trim(), max_results)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("Video search error: {e:#}")))?;

    Ok(Json(VideoSearchResponse {
        total_found: videos.len(),
        videos,
        query: params.query,
        platform: "youtube",
    }))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        cache_healthy: state.orchestrator.cache_healthy().await,
    })
}
