use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::data_models::{Rating, Recipe};

/// A backend that turns a query string into candidate recipes. The production
/// adapter scrapes a recipe site; tests substitute stubs.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Recipe>>;

    /// Scrapes a single recipe page by URL. `Ok(None)` means the page was
    /// fetched but held no recognizable recipe.
    async fn fetch(&self, url: &str) -> Result<Option<Recipe>>;
}

/// Scrapes allrecipes.com: one search-page request to harvest recipe links,
/// then a bounded number of concurrent page fetches. Recipe pages embed
/// JSON-LD structured data, which is preferred over raw HTML selectors.
pub struct AllrecipesScraper {
    client: reqwest::Client,
    base_url: String,
    concurrency: usize,
}

impl AllrecipesScraper {
    pub fn new(base_url: String, user_agent: &str, concurrency: usize) -> Result<AllrecipesScraper> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to build scraper HTTP client")?;
        Ok(AllrecipesScraper {
            client,
            base_url,
            concurrency: concurrency.max(1),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("Request to {url} returned error status"))?;
        let body = res.text().await.context("Failed to read response body")?;
        Ok(body)
    }

    async fn scrape_recipe(&self, url: String) -> Option<Recipe> {
        match self.fetch_page(&url).await {
            Ok(html) => parse_recipe_page(&html, &url),
            Err(e) => {
                log::warn!("error scraping recipe {url}, error: {:#}", e);
                None
            }
        }
    }
}

#[async_trait]
impl RecipeSource for AllrecipesScraper {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Recipe>> {
        let search_url = format!("{}/search", self.base_url);
        let res = self
            .client
            .get(&search_url)
            .query(&[("q", query)])
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search request returned error status")?;
        let html = res.text().await.context("Failed to read search page")?;

        let links = extract_recipe_links(&html, &self.base_url, max_results);
        if links.is_empty() {
            log::warn!("no recipe links found for query: {query}");
            return Ok(Vec::new());
        }

        let recipes: Vec<Recipe> = futures::stream::iter(links)
            .map(|url| self.scrape_recipe(url))
            .buffered(self.concurrency)
            .filter_map(|r| async move { r })
            .collect()
            .await;

        Ok(recipes)
    }

    async fn fetch(&self, url: &str) -> Result<Option<Recipe>> {
        let html = self.fetch_page(url).await?;
        Ok(parse_recipe_page(&html, url))
    }
}

/// Pulls unique `/recipe/` hrefs out of a search results page, resolved
/// against the site base, in page order.
fn extract_recipe_links(html: &str, base_url: &str, max_results: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href*='/recipe/']").expect("static selector");

    let base = match Url::parse(base_url) {
        Ok(b) => b,
        Err(_) => return Vec::new(),
    };

    let mut links = Vec::new();
    for element in document.select(&link_selector) {
        if links.len() >= max_results {
            break;
        }
        if let Some(href) = element.value().attr("href") {
            if let Ok(resolved) = base.join(href) {
                let resolved = resolved.to_string();
                if !links.contains(&resolved) {
                    links.push(resolved);
                }
            }
        }
    }
    links
}

fn parse_recipe_page(html: &str, url: &str) -> Option<Recipe> {
    let document = Html::parse_document(html);

    if let Some(mut recipe) = extract_json_ld(&document, url) {
        if recipe.title.is_empty() {
            recipe.title = extract_title(&document);
        }
        if recipe.title.is_empty() {
            return None;
        }
        return Some(recipe);
    }

    // Fallback to plain HTML scraping when no structured data is present
    let title = extract_title(&document);
    if title.is_empty() {
        return None;
    }
    let mut recipe = Recipe::new(title, url.to_string());
    recipe.ingredients = extract_ingredients(&document);
    recipe.instructions = extract_instructions(&document);
    recipe.image_url = extract_image_url(&document);
    Some(recipe)
}

fn extract_json_ld(document: &Html, url: &str) -> Option<Recipe> {
    let script_selector = Selector::parse("script[type='application/ld+json']").expect("static selector");

    for script in document.select(&script_selector) {
        let raw = script.text().collect::<String>();
        let Ok(data) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        if let Some(node) = find_recipe_node(&data) {
            return Some(parse_json_ld_recipe(node, url));
        }
    }
    None
}

/// JSON-LD comes in several shapes: a bare object, an array of objects, or a
/// `@graph` wrapper. `@type` itself may be a string or an array of strings.
fn find_recipe_node(data: &Value) -> Option<&Value> {
    match data {
        Value::Array(items) => items.iter().find_map(find_recipe_node),
        Value::Object(map) => {
            if is_recipe_type(map.get("@type")) {
                return Some(data);
            }
            map.get("@graph").and_then(find_recipe_node)
        }
        _ => None,
    }
}

fn is_recipe_type(ty: Option<&Value>) -> bool {
    match ty {
        Some(Value::String(s)) => s == "Recipe",
        Some(Value::Array(items)) => items.iter().any(|t| t.as_str() == Some("Recipe")),
        _ => false,
    }
}

fn parse_json_ld_recipe(node: &Value, url: &str) -> Recipe {
    let title = node
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let mut recipe = Recipe::new(title, url.to_string());

    if let Some(items) = node.get("recipeIngredient").and_then(Value::as_array) {
        recipe.ingredients = items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    if let Some(items) = node.get("recipeInstructions").and_then(Value::as_array) {
        recipe.instructions = items
            .iter()
            .filter_map(|step| match step {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj.get("text").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect();
    }

    for (source, label) in [
        ("prepTime", "prep_time"),
        ("cookTime", "cook_time"),
        ("totalTime", "total_time"),
    ] {
        if let Some(v) = node.get(source).and_then(Value::as_str) {
            recipe.time_info.insert(label.to_string(), v.to_string());
        }
    }

    if let Some(agg) = node.get("aggregateRating") {
        let value = number_field(agg, "ratingValue");
        let count = number_field(agg, "ratingCount").map(|c| c as u64);
        if value.is_some() || count.is_some() {
            recipe.rating = Some(Rating { value, count });
        }
    }

    recipe.image_url = match node.get("image") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj.get("url").and_then(Value::as_str).map(str::to_string),
        Some(Value::Array(items)) => items.first().and_then(|first| match first {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }),
        _ => None,
    };

    if let Some(nut) = node.get("nutrition").and_then(Value::as_object) {
        let mut nutrition = HashMap::new();
        for (source, label) in [
            ("calories", "calories"),
            ("proteinContent", "protein"),
            ("carbohydrateContent", "carbs"),
            ("fatContent", "fat"),
            ("fiberContent", "fiber"),
            ("sugarContent", "sugar"),
        ] {
            if let Some(v) = nut.get(source).and_then(Value::as_str) {
                nutrition.insert(label.to_string(), v.to_string());
            }
        }
        if !nutrition.is_empty() {
            recipe.nutrition = Some(nutrition);
        }
    }

    recipe.tags = match node.get("keywords") {
        Some(Value::String(s)) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    recipe.servings = match node.get("recipeYield") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Array(items)) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    };

    recipe.description = node
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    recipe
}

fn number_field(node: &Value, key: &str) -> Option<f64> {
    match node.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn extract_title(document: &Html) -> String {
    for selector in [
        "h1.entry-title",
        "h1.recipe-title",
        "h1.mntl-text-block",
        "h1.headline",
        "h1",
    ] {
        let sel = Selector::parse(selector).expect("static selector");
        if let Some(element) = document.select(&sel).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn extract_ingredients(document: &Html) -> Vec<String> {
    for selector in [
        "[data-test-id*='ingredient']",
        ".mntl-structured-ingredients__list-item",
        ".recipe-ingredient",
        ".ingredients-item-name",
    ] {
        let sel = Selector::parse(selector).expect("static selector");
        let ingredients: Vec<String> = document
            .select(&sel)
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|t| t.len() > 1)
            .collect();
        if !ingredients.is_empty() {
            return ingredients;
        }
    }
    Vec::new()
}

fn extract_instructions(document: &Html) -> Vec<String> {
    for selector in [
        "[data-test-id*='instruction']",
        ".mntl-sc-block-group--OL .mntl-sc-block",
        ".recipe-instruction",
        ".instructions-section-item p",
    ] {
        let sel = Selector::parse(selector).expect("static selector");
        let instructions: Vec<String> = document
            .select(&sel)
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|t| t.len() > 10)
            .collect();
        if !instructions.is_empty() {
            return instructions;
        }
    }
    Vec::new()
}

fn extract_image_url(document: &Html) -> Option<String> {
    for selector in [
        ".primary-image img",
        ".recipe-image img",
        ".mntl-primary-image img",
    ] {
        let sel = Selector::parse(selector).expect("static selector");
        if let Some(element) = document.select(&sel).next() {
            let url = element
                .value()
                .attr("data-src")
                .or_else(|| element.value().attr("src"));
            if let Some(url) = url {
                return Some(url.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE_PAGE: &str = r#"
        <html><head>
        <script type="application/ld+json">
        [{
            "@type": ["Recipe"],
            "name": "Chicken Curry",
            "recipeIngredient": ["1 lb chicken", "2 tbsp curry powder"],
            "recipeInstructions": [
                {"@type": "HowToStep", "text": "Brown the chicken."},
                {"@type": "HowToStep", "text": "Simmer with curry powder."}
            ],
            "prepTime": "PT15M",
            "cookTime": "PT30M",
            "totalTime": "PT45M",
            "aggregateRating": {"ratingValue": "4.5", "ratingCount": 210},
            "image": {"url": "https://img.example.com/curry.jpg"},
            "nutrition": {"calories": "320 kcal", "proteinContent": "28 g"},
            "keywords": "indian, dinner, curry",
            "recipeYield": "4",
            "description": "A weeknight curry."
        }]
        </script>
        </head><body><h1>ignored</h1></body></html>
    "#;

    #[test]
    fn test_parse_recipe_page_json_ld() {
        let recipe = parse_recipe_page(RECIPE_PAGE, "https://site.com/recipe/1").unwrap();

        assert_eq!(recipe.title, "Chicken Curry");
        assert_eq!(recipe.source_url, "https://site.com/recipe/1");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.instructions[0], "Brown the chicken.");
        assert_eq!(recipe.time_info.get("total_time").unwrap(), "PT45M");
        let rating = recipe.rating.unwrap();
        assert_eq!(rating.value, Some(4.5));
        assert_eq!(rating.count, Some(210));
        assert_eq!(
            recipe.image_url.as_deref(),
            Some("https://img.example.com/curry.jpg")
        );
        assert_eq!(recipe.tags, vec!["indian", "dinner", "curry"]);
        assert_eq!(recipe.servings.as_deref(), Some("4"));
        assert_eq!(
            recipe.nutrition.unwrap().get("protein").map(String::as_str),
            Some("28 g")
        );
    }

    #[test]
    fn test_parse_recipe_page_html_fallback() {
        let html = r#"
            <html><body>
            <h1 class="headline">Simple Toast</h1>
            <ul>
                <li class="recipe-ingredient">2 slices bread</li>
                <li class="recipe-ingredient">butter</li>
            </ul>
            <div class="instructions-section-item"><p>Toast the bread until golden.</p></div>
            </body></html>
        "#;
        let recipe = parse_recipe_page(html, "https://site.com/recipe/2").unwrap();

        assert_eq!(recipe.title, "Simple Toast");
        assert_eq!(recipe.ingredients, vec!["2 slices bread", "butter"]);
        assert_eq!(recipe.instructions.len(), 1);
        assert!(recipe.time_info.is_empty());
    }

    #[test]
    fn test_parse_recipe_page_without_title_is_none() {
        let html = "<html><body><p>not a recipe</p></body></html>";
        assert!(parse_recipe_page(html, "https://site.com/x").is_none());
    }

    #[test]
    fn test_extract_recipe_links_dedups_and_limits() {
        let html = r#"
            <html><body>
            <a href="/recipe/1/curry/">one</a>
            <a href="/recipe/1/curry/">dupe</a>
            <a href="/recipe/2/toast/">two</a>
            <a href="/about/">not a recipe</a>
            <a href="/recipe/3/soup/">three</a>
            </body></html>
        "#;
        let links = extract_recipe_links(html, "https://www.allrecipes.com", 2);

        assert_eq!(
            links,
            vec![
                "https://www.allrecipes.com/recipe/1/curry/",
                "https://www.allrecipes.com/recipe/2/toast/",
            ]
        );
    }
}
