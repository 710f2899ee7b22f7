use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scraped recipe. `source_url` is the natural identity: two records with
/// the same source URL describe the same recipe.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Recipe {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub time_info: HashMap<String, String>,
    pub rating: Option<Rating>,
    pub servings: Option<String>,
    pub description: Option<String>,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
    pub video_url: Option<String>,
    pub nutrition: Option<HashMap<String, String>>,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub review_count: u64,
}

impl Recipe {
    pub fn new(title: String, source_url: String) -> Recipe {
        Recipe {
            title,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            image_url: None,
            time_info: HashMap::new(),
            rating: None,
            servings: None,
            description: None,
            source_url,
            scraped_at: Utc::now(),
            video_url: None,
            nutrition: None,
            difficulty: None,
            tags: Vec::new(),
            average_rating: None,
            review_count: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Rating {
    pub value: Option<f64>,
    pub count: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VideoTutorial {
    pub title: String,
    pub url: String,
    pub duration: Option<String>,
    pub thumbnail: Option<String>,
    pub channel: Option<String>,
    pub views: Option<String>,
}

/// One inbound search request. Built once per request and never mutated.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: usize,
    pub include_nutrition: bool,
    pub include_videos: bool,
    pub difficulty_filter: Option<String>,
    pub max_time_minutes: Option<u32>,
    pub ingredients_filter: Vec<String>,
    pub cuisine_filter: Option<String>,
    pub tags_filter: Vec<String>,
    pub use_cache: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> SearchQuery {
        SearchQuery {
            query: query.into(),
            max_results: 10,
            include_nutrition: false,
            include_videos: true,
            difficulty_filter: None,
            max_time_minutes: None,
            ingredients_filter: Vec::new(),
            cuisine_filter: None,
            tags_filter: Vec::new(),
            use_cache: true,
        }
    }
}

/// The terminal output of one search. Also what gets serialized into the
/// cache, so cached hits deserialize straight back into this.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchResponse {
    pub recipes: Vec<Recipe>,
    pub total_found: usize,
    pub query: String,
    pub search_time: f64,
    pub cached: bool,
    pub video_results: Option<Vec<VideoTutorial>>,
}
