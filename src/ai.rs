use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Rewrites a raw user query into a sharper search phrase. Strictly
/// best-effort: the orchestrator swallows any failure and searches with the
/// original text.
#[async_trait]
pub trait QueryRefiner: Send + Sync {
    async fn refine(&self, query: &str) -> Result<String>;
}

/// Writes a full recipe from a pantry list. Backs the
/// generate-from-ingredients endpoint; unavailable without an API key.
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate_recipe(&self, ingredients: &[String]) -> Result<String>;
}

/// Gemini REST adapter for query refinement.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<GeminiClient> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build Gemini HTTP client")?;
        Ok(GeminiClient {
            client,
            api_key,
            model,
        })
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let res = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?
            .error_for_status()
            .context("Gemini returned error status")?;

        let data: Value = res.json().await.context("Failed to decode Gemini response")?;
        let text = data
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Gemini response missing candidate text"))?;
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl QueryRefiner for GeminiClient {
    async fn refine(&self, query: &str) -> Result<String> {
        let prompt = format!(
            "Given the following user query for a recipe search, extract the most relevant \
             keywords or a refined search phrase that would yield the best results. Focus on \
             ingredients, cuisine types, dish names, or cooking styles. If the query is already \
             concise, return it as is. Do not include any conversational filler or explanations, \
             just the refined query.\n\nUser query: {query}\nRefined query:"
        );
        let refined = self.generate(prompt).await?;
        if refined.is_empty() {
            return Err(anyhow!("Gemini returned an empty refinement"));
        }
        Ok(refined)
    }
}

#[async_trait]
impl RecipeGenerator for GeminiClient {
    async fn generate_recipe(&self, ingredients: &[String]) -> Result<String> {
        let prompt = format!(
            "Generate a creative and complete recipe using only the following ingredients: {}. \
             Include a title, a short description, an ingredients list with quantities, and \
             step-by-step instructions. Format it clearly. If possible, suggest a cuisine \
             style.\n\nRecipe:",
            ingredients.join(", ")
        );
        let generated = self.generate(prompt).await?;
        if generated.is_empty() {
            return Err(anyhow!("Gemini returned an empty recipe"));
        }
        Ok(generated)
    }
}
