use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        bind_addr: get_env_or_default("BIND_ADDR", "0.0.0.0:8080"),
        recipe_base_url: get_env_or_default("RECIPE_BASE_URL", "https://www.allrecipes.com"),
        youtube_base_url: get_env_or_default("YOUTUBE_BASE_URL", "https://www.youtube.com"),
        gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
        gemini_model: get_env_or_default("GEMINI_MODEL", "gemini-pro"),
        user_agent: get_env_or_default(
            "SCRAPE_USER_AGENT",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
        cache_ttl: secs_env("CACHE_TTL_SECS", 3600),
        search_timeout: secs_env("SEARCH_TIMEOUT_SECS", 30),
        ai_timeout: secs_env("AI_TIMEOUT_SECS", 5),
        video_timeout: secs_env("VIDEO_TIMEOUT_SECS", 5),
        video_concurrency: usize_env("VIDEO_CONCURRENCY", 5),
        scrape_concurrency: usize_env("SCRAPE_CONCURRENCY", 5),
    }
});

pub struct Config {
    pub bind_addr: String,
    pub recipe_base_url: String,
    pub youtube_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub user_agent: String,
    pub cache_ttl: Duration,
    pub search_timeout: Duration,
    pub ai_timeout: Duration,
    pub video_timeout: Duration,
    pub video_concurrency: usize,
    pub scrape_concurrency: usize,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn secs_env(key: &str, default: u64) -> Duration {
    let secs = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn usize_env(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
