use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ai::QueryRefiner;
use crate::cache::RecipeCache;
use crate::data_models::{Recipe, SearchQuery, SearchResponse, VideoTutorial};
use crate::scrapper::RecipeSource;
use crate::videos::VideoSource;

/// Errors a search can surface to the caller. Everything else (cache being
/// down, AI refinement failing, individual video lookups failing) is absorbed
/// with best-effort fallback and shows up only in logs.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search query: {0}")]
    Validation(String),

    #[error("recipe source failed: {0}")]
    Upstream(#[source] anyhow::Error),

    #[error("search timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub cache_ttl: Duration,
    /// Budget for one whole uncached search (refinement, scrape, enrichment).
    pub overall_timeout: Duration,
    pub ai_timeout: Duration,
    /// Per-lookup budget for a single video search.
    pub video_timeout: Duration,
    pub video_concurrency: usize,
    /// How many tutorial hits to request per recipe title.
    pub videos_per_recipe: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            cache_ttl: Duration::from_secs(3600),
            overall_timeout: Duration::from_secs(30),
            ai_timeout: Duration::from_secs(5),
            video_timeout: Duration::from_secs(5),
            video_concurrency: 5,
            videos_per_recipe: 3,
        }
    }
}

/// Composes the cache, recipe source, video lookup, and optional AI query
/// refinement into one search pipeline: consult cache, scrape, dedup by
/// `source_url`, filter, truncate, enrich with videos, write back to cache.
pub struct SearchOrchestrator {
    cache: Arc<dyn RecipeCache>,
    recipes: Arc<dyn RecipeSource>,
    videos: Arc<dyn VideoSource>,
    refiner: Option<Arc<dyn QueryRefiner>>,
    config: SearchConfig,
}

impl SearchOrchestrator {
    pub fn new(
        cache: Arc<dyn RecipeCache>,
        recipes: Arc<dyn RecipeSource>,
        videos: Arc<dyn VideoSource>,
        refiner: Option<Arc<dyn QueryRefiner>>,
        config: SearchConfig,
    ) -> SearchOrchestrator {
        SearchOrchestrator {
            cache,
            recipes,
            videos,
            refiner,
            config,
        }
    }

    pub async fn cache_healthy(&self) -> bool {
        self.cache.is_healthy().await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        validate(query)?;
        let start = Instant::now();
        let key = cache_key(query);

        if query.use_cache {
            if let Some(mut hit) = self.cached_response(&key).await {
                hit.cached = true;
                hit.search_time = start.elapsed().as_secs_f64();
                return Ok(hit);
            }
        }

        let response = tokio::time::timeout(
            self.config.overall_timeout,
            self.search_uncached(query, start),
        )
        .await
        .map_err(|_| SearchError::Timeout(self.config.overall_timeout))??;

        if query.use_cache {
            self.store_response(&key, &response).await;
        }
        Ok(response)
    }

    async fn search_uncached(
        &self,
        query: &SearchQuery,
        start: Instant,
    ) -> Result<SearchResponse, SearchError> {
        let search_text = self.refined_query(&query.query).await;

        let scraped = self
            .recipes
            .search(&search_text, query.max_results)
            .await
            .map_err(SearchError::Upstream)?;

        let mut recipes = dedup_by_source_url(scraped);
        recipes.retain(|r| passes_filters(r, query));
        recipes.truncate(query.max_results);

        // Nutrition rides along from scraping; the flag controls whether
        // the response exposes it.
        if !query.include_nutrition {
            for recipe in &mut recipes {
                recipe.nutrition = None;
            }
        }

        let video_results = if query.include_videos {
            Some(self.attach_videos(&mut recipes).await)
        } else {
            None
        };

        Ok(SearchResponse {
            total_found: recipes.len(),
            recipes,
            query: query.query.trim().to_string(),
            search_time: start.elapsed().as_secs_f64(),
            cached: false,
            video_results,
        })
    }

    /// Best-effort AI rewrite of the query. Anything going wrong here (error,
    /// timeout, blank answer) falls back to the user's own text.
    async fn refined_query(&self, original: &str) -> String {
        let Some(refiner) = &self.refiner else {
            return original.to_string();
        };
        match tokio::time::timeout(self.config.ai_timeout, refiner.refine(original)).await {
            Ok(Ok(refined)) if !refined.trim().is_empty() => {
                tracing::debug!(%original, %refined, "query refined");
                refined
            }
            Ok(Ok(_)) => original.to_string(),
            Ok(Err(e)) => {
                log::warn!("query refinement failed, using original: {:#}", e);
                original.to_string()
            }
            Err(_) => {
                log::warn!(
                    "query refinement timed out after {:?}, using original",
                    self.config.ai_timeout
                );
                original.to_string()
            }
        }
    }

    /// Looks up tutorial videos per recipe title, a bounded number in flight
    /// at once, each under its own timeout. A failed lookup leaves that one
    /// recipe's `video_url` unset; the others are unaffected.
    async fn attach_videos(&self, recipes: &mut [Recipe]) -> Vec<VideoTutorial> {
        let per_lookup = self.config.video_timeout;
        let per_recipe = self.config.videos_per_recipe;

        // The stream must own the titles: embedding a borrowing iterator
        // makes the whole search future non-Send.
        let titles: Vec<String> = recipes.iter().map(|r| r.title.clone()).collect();
        let lookups: Vec<Option<Vec<VideoTutorial>>> =
            futures::stream::iter(titles)
                .map(|title| {
                    let videos = Arc::clone(&self.videos);
                    async move {
                        match tokio::time::timeout(
                            per_lookup,
                            videos.search_videos(&title, per_recipe),
                        )
                        .await
                        {
                            Ok(Ok(found)) if !found.is_empty() => Some(found),
                            Ok(Ok(_)) => None,
                            Ok(Err(e)) => {
                                log::warn!("video lookup failed for '{title}': {:#}", e);
                                None
                            }
                            Err(_) => {
                                log::warn!("video lookup timed out for '{title}'");
                                None
                            }
                        }
                    }
                })
                .buffered(self.config.video_concurrency.max(1))
                .collect()
                .await;

        let mut all_videos = Vec::new();
        for (recipe, lookup) in recipes.iter_mut().zip(lookups) {
            if let Some(found) = lookup {
                recipe.video_url = Some(found[0].url.clone());
                all_videos.extend(found);
            }
        }
        all_videos
    }

    async fn cached_response(&self, key: &str) -> Option<SearchResponse> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("cache get failed, treating as miss: {:#}", e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(response) => Some(response),
            Err(e) => {
                log::warn!("cached entry undecodable, treating as miss: {:#}", e);
                None
            }
        }
    }

    async fn store_response(&self, key: &str, response: &SearchResponse) {
        let bytes = match serde_json::to_vec(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("failed to serialize response for cache: {:#}", e);
                return;
            }
        };
        if let Err(e) = self.cache.set(key, bytes, self.config.cache_ttl).await {
            log::warn!("cache set failed: {:#}", e);
        }
    }
}

fn validate(query: &SearchQuery) -> Result<(), SearchError> {
    let trimmed = query.query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::Validation("query must not be empty".into()));
    }
    if trimmed.chars().count() > 100 {
        return Err(SearchError::Validation(
            "query must be at most 100 characters".into(),
        ));
    }
    if !(1..=50).contains(&query.max_results) {
        return Err(SearchError::Validation(
            "max_results must be between 1 and 50".into(),
        ));
    }
    Ok(())
}

/// Cache key over the normalized query, the sorted active filters and the two
/// include flags. Normalization (trim + lowercase) is for keying only; the
/// response echoes the caller's casing.
pub fn cache_key(query: &SearchQuery) -> String {
    let mut filters: Vec<String> = Vec::new();
    if let Some(d) = &query.difficulty_filter {
        filters.push(format!("difficulty={}", d.trim().to_lowercase()));
    }
    if let Some(m) = query.max_time_minutes {
        filters.push(format!("max_time={m}"));
    }
    for ingredient in &query.ingredients_filter {
        filters.push(format!("ingredient={}", ingredient.trim().to_lowercase()));
    }
    if let Some(c) = &query.cuisine_filter {
        filters.push(format!("cuisine={}", c.trim().to_lowercase()));
    }
    for tag in &query.tags_filter {
        filters.push(format!("tag={}", tag.trim().to_lowercase()));
    }
    filters.sort();

    let mut hasher = Sha256::new();
    hasher.update(query.query.trim().to_lowercase());
    for filter in &filters {
        hasher.update("|");
        hasher.update(filter);
    }
    hasher.update(format!(
        "|nutrition={}|videos={}",
        query.include_nutrition, query.include_videos
    ));
    hex::encode(hasher.finalize())
}

fn dedup_by_source_url(recipes: Vec<Recipe>) -> Vec<Recipe> {
    let mut seen = HashSet::new();
    recipes
        .into_iter()
        .filter(|r| seen.insert(r.source_url.clone()))
        .collect()
}

fn passes_filters(recipe: &Recipe, query: &SearchQuery) -> bool {
    if let Some(want) = &query.difficulty_filter {
        let matches = recipe
            .difficulty
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case(want.trim()));
        if !matches {
            return false;
        }
    }

    if let Some(max_minutes) = query.max_time_minutes {
        // A recipe that reports no parseable time can't be shown to fit the
        // bound, so it is dropped while this filter is active.
        let within = recipe_minutes(recipe).is_some_and(|m| m <= max_minutes);
        if !within {
            return false;
        }
    }

    if !query.ingredients_filter.is_empty() {
        let ingredients: Vec<String> = recipe
            .ingredients
            .iter()
            .map(|i| i.to_lowercase())
            .collect();
        for want in &query.ingredients_filter {
            let want = want.trim().to_lowercase();
            if want.is_empty() {
                continue;
            }
            if !ingredients.iter().any(|i| i.contains(&want)) {
                return false;
            }
        }
    }

    if let Some(cuisine) = &query.cuisine_filter {
        let cuisine = cuisine.trim().to_lowercase();
        if !cuisine.is_empty()
            && !recipe
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&cuisine))
        {
            return false;
        }
    }

    for want in &query.tags_filter {
        let want = want.trim();
        if want.is_empty() {
            continue;
        }
        if !recipe.tags.iter().any(|t| t.eq_ignore_ascii_case(want)) {
            return false;
        }
    }

    true
}

/// Total minutes for a recipe, preferring `total_time`, else the largest
/// duration in `time_info`.
fn recipe_minutes(recipe: &Recipe) -> Option<u32> {
    if let Some(total) = recipe.time_info.get("total_time") {
        if let Some(minutes) = parse_minutes(total) {
            return Some(minutes);
        }
    }
    recipe
        .time_info
        .values()
        .filter_map(|v| parse_minutes(v))
        .max()
}

static ISO_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^PT(?:(\d+)H)?(?:(\d+)M)?(?:\d+S)?$").expect("static regex"));
static HOURS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:hours?|hrs?|h)\b").expect("static regex"));
static MINUTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:minutes?|mins?|m)\b").expect("static regex"));

/// Parses duration strings as they appear in scraped `time_info`: ISO-8601
/// (`PT1H30M`), loose English (`1 hr 30 mins`), or a bare minute count.
fn parse_minutes(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DURATION_RE.captures(raw) {
        let hours: u32 = caps.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let minutes: u32 = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        if caps.get(1).is_some() || caps.get(2).is_some() {
            return Some(hours * 60 + minutes);
        }
        return None;
    }

    let hours: u32 = HOURS_RE
        .captures(raw)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    let minutes: u32 = MINUTES_RE
        .captures(raw)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    if hours > 0 || minutes > 0 {
        return Some(hours * 60 + minutes);
    }

    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes_iso() {
        assert_eq!(parse_minutes("PT45M"), Some(45));
        assert_eq!(parse_minutes("PT1H30M"), Some(90));
        assert_eq!(parse_minutes("PT2H"), Some(120));
        assert_eq!(parse_minutes("pt15m"), Some(15));
    }

    #[test]
    fn test_parse_minutes_loose() {
        assert_eq!(parse_minutes("45 mins"), Some(45));
        assert_eq!(parse_minutes("1 hr 30 mins"), Some(90));
        assert_eq!(parse_minutes("2 hours"), Some(120));
        assert_eq!(parse_minutes("90 m"), Some(90));
    }

    #[test]
    fn test_parse_minutes_bare_and_garbage() {
        assert_eq!(parse_minutes("45"), Some(45));
        assert_eq!(parse_minutes("soon"), None);
        assert_eq!(parse_minutes(""), None);
        assert_eq!(parse_minutes("PT"), None);
    }

    #[test]
    fn test_cache_key_normalizes_query() {
        let a = SearchQuery::new("Chicken Curry");
        let b = SearchQuery::new("  chicken curry  ");
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_cache_key_ignores_filter_order() {
        let mut a = SearchQuery::new("pasta");
        a.tags_filter = vec!["quick".into(), "dinner".into()];
        let mut b = SearchQuery::new("pasta");
        b.tags_filter = vec!["dinner".into(), "quick".into()];
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_cache_key_distinguishes_filters_and_flags() {
        let base = SearchQuery::new("pasta");

        let mut with_difficulty = base.clone();
        with_difficulty.difficulty_filter = Some("easy".into());
        assert_ne!(cache_key(&base), cache_key(&with_difficulty));

        let mut without_videos = base.clone();
        without_videos.include_videos = false;
        assert_ne!(cache_key(&base), cache_key(&without_videos));
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let recipes = vec![
            Recipe::new("A".into(), "https://site.com/a".into()),
            Recipe::new("B".into(), "https://site.com/b".into()),
            Recipe::new("A again".into(), "https://site.com/a".into()),
            Recipe::new("C".into(), "https://site.com/c".into()),
        ];
        let deduped = dedup_by_source_url(recipes);
        let titles: Vec<&str> = deduped.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_max_time_filter_drops_unparseable() {
        let mut query = SearchQuery::new("stew");
        query.max_time_minutes = Some(60);

        let mut quick = Recipe::new("Quick".into(), "https://site.com/q".into());
        quick
            .time_info
            .insert("total_time".into(), "PT30M".into());
        assert!(passes_filters(&quick, &query));

        let mut slow = Recipe::new("Slow".into(), "https://site.com/s".into());
        slow.time_info
            .insert("total_time".into(), "PT2H".into());
        assert!(!passes_filters(&slow, &query));

        let untimed = Recipe::new("Untimed".into(), "https://site.com/u".into());
        assert!(!passes_filters(&untimed, &query));
    }

    #[test]
    fn test_ingredient_filter_is_substring_match() {
        let mut query = SearchQuery::new("curry");
        query.ingredients_filter = vec!["chicken".into()];

        let mut with = Recipe::new("Curry".into(), "https://site.com/1".into());
        with.ingredients = vec!["1 lb Chicken thighs".into(), "rice".into()];
        assert!(passes_filters(&with, &query));

        let mut without = Recipe::new("Dal".into(), "https://site.com/2".into());
        without.ingredients = vec!["lentils".into()];
        assert!(!passes_filters(&without, &query));
    }

    #[test]
    fn test_cuisine_and_tag_filters_use_tags() {
        let mut recipe = Recipe::new("Tikka".into(), "https://site.com/t".into());
        recipe.tags = vec!["Indian Cuisine".into(), "Dinner".into()];

        let mut by_cuisine = SearchQuery::new("tikka");
        by_cuisine.cuisine_filter = Some("indian".into());
        assert!(passes_filters(&recipe, &by_cuisine));

        let mut by_tags = SearchQuery::new("tikka");
        by_tags.tags_filter = vec!["dinner".into()];
        assert!(passes_filters(&recipe, &by_tags));

        by_tags.tags_filter = vec!["dinner".into(), "vegan".into()];
        assert!(!passes_filters(&recipe, &by_tags));
    }

    #[test]
    fn test_validate_bounds() {
        assert!(matches!(
            validate(&SearchQuery::new("  ")),
            Err(SearchError::Validation(_))
        ));

        let long = "x".repeat(101);
        assert!(matches!(
            validate(&SearchQuery::new(long)),
            Err(SearchError::Validation(_))
        ));

        let mut zero = SearchQuery::new("ok");
        zero.max_results = 0;
        assert!(matches!(
            validate(&zero),
            Err(SearchError::Validation(_))
        ));

        let mut too_many = SearchQuery::new("ok");
        too_many.max_results = 51;
        assert!(matches!(
            validate(&too_many),
            Err(SearchError::Validation(_))
        ));

        assert!(validate(&SearchQuery::new("chicken curry")).is_ok());
    }
}
