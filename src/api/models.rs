use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_models::{Recipe, SearchQuery, VideoTutorial};

/// Query parameters for `GET /api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<usize>,
    pub use_cache: Option<bool>,
    pub include_videos: Option<bool>,
    pub include_nutrition: Option<bool>,
    /// Comma-separated ingredients the results must contain.
    pub ingredients: Option<String>,
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    /// Comma-separated tags the results must carry.
    pub tags: Option<String>,
    /// Upper bound on total time, in minutes.
    pub max_time: Option<u32>,
}

impl SearchParams {
    pub fn into_query(self) -> SearchQuery {
        let mut query = SearchQuery::new(self.q);
        if let Some(limit) = self.limit {
            query.max_results = limit;
        }
        if let Some(use_cache) = self.use_cache {
            query.use_cache = use_cache;
        }
        if let Some(include_videos) = self.include_videos {
            query.include_videos = include_videos;
        }
        if let Some(include_nutrition) = self.include_nutrition {
            query.include_nutrition = include_nutrition;
        }
        query.ingredients_filter = split_csv(self.ingredients);
        query.tags_filter = split_csv(self.tags);
        query.cuisine_filter = self.cuisine.filter(|c| !c.trim().is_empty());
        query.difficulty_filter = self.difficulty.filter(|d| !d.trim().is_empty());
        query.max_time_minutes = self.max_time;
        query
    }
}

fn split_csv(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Query parameters for `GET /api/recipe`.
#[derive(Debug, Deserialize)]
pub struct RecipeParams {
    pub url: String,
    pub include_videos: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetailResponse {
    pub recipe: Recipe,
    pub processing_time: f64,
    pub video_tutorials: Vec<VideoTutorial>,
}

/// Body for `POST /api/recipes/generate-from-ingredients`.
#[derive(Debug, Deserialize)]
pub struct GenerateRecipeRequest {
    pub ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateRecipeResponse {
    pub generated_recipe: String,
    pub ingredients_used: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoSearchParams {
    pub query: String,
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct VideoSearchResponse {
    pub videos: Vec<VideoTutorial>,
    pub query: String,
    pub total_found: usize,
    pub platform: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub cache_healthy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_query_defaults() {
        let params = SearchParams {
            q: "chicken curry".into(),
            limit: None,
            use_cache: None,
            include_videos: None,
            include_nutrition: None,
            ingredients: None,
            cuisine: None,
            difficulty: None,
            tags: None,
            max_time: None,
        };
        let query = params.into_query();

        assert_eq!(query.query, "chicken curry");
        assert_eq!(query.max_results, 10);
        assert!(query.use_cache);
        assert!(query.include_videos);
        assert!(!query.include_nutrition);
        assert!(query.ingredients_filter.is_empty());
    }

    #[test]
    fn test_into_query_splits_csv_filters() {
        let params = SearchParams {
            q: "curry".into(),
            limit: Some(5),
            use_cache: Some(false),
            include_videos: Some(false),
            include_nutrition: None,
            ingredients: Some("chicken, rice ,,".into()),
            cuisine: Some(" ".into()),
            difficulty: Some("easy".into()),
            tags: Some("dinner".into()),
            max_time: Some(45),
        };
        let query = params.into_query();

        assert_eq!(query.max_results, 5);
        assert!(!query.use_cache);
        assert_eq!(query.ingredients_filter, vec!["chicken", "rice"]);
        assert_eq!(query.cuisine_filter, None, "blank cuisine is dropped");
        assert_eq!(query.difficulty_filter.as_deref(), Some("easy"));
        assert_eq!(query.tags_filter, vec!["dinner"]);
        assert_eq!(query.max_time_minutes, Some(45));
    }
}
