use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::data_models::VideoTutorial;

/// Tutorial-video lookup keyed by a free-text query. Failures here are
/// always absorbed by the caller; a recipe without a video is still a result.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn search_videos(&self, query: &str, max_results: usize) -> Result<Vec<VideoTutorial>>;
}

// YouTube inlines its result data as a JS blob; video ids and titles are
// mined straight out of it.
static VIDEO_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""videoId":"([^"]+)".*?"title":\{"runs":\[\{"text":"([^"]+)""#)
        .expect("static regex")
});

/// Scrapes the YouTube results page for recipe tutorial videos.
pub struct YoutubeScraper {
    client: reqwest::Client,
    base_url: String,
}

impl YoutubeScraper {
    pub fn new(base_url: String, user_agent: &str) -> Result<YoutubeScraper> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build video HTTP client")?;
        Ok(YoutubeScraper { client, base_url })
    }
}

#[async_trait]
impl VideoSource for YoutubeScraper {
    async fn search_videos(&self, query: &str, max_results: usize) -> Result<Vec<VideoTutorial>> {
        let search_query = format!("{query} recipe cooking tutorial");
        let url = format!("{}/results", self.base_url);
        let res = self
            .client
            .get(&url)
            .query(&[("search_query", search_query.as_str())])
            .send()
            .await
            .context("Video search request failed")?
            .error_for_status()
            .context("Video search returned error status")?;
        let html = res.text().await.context("Failed to read video results")?;

        let mut videos = extract_initial_data_videos(&html, &self.base_url, max_results);
        if videos.is_empty() {
            videos = extract_anchor_videos(&html, &self.base_url, max_results);
        }
        Ok(videos)
    }
}

fn extract_initial_data_videos(html: &str, base_url: &str, max_results: usize) -> Vec<VideoTutorial> {
    let mut videos = Vec::new();
    let mut seen_ids = Vec::new();

    for caps in VIDEO_DATA_RE.captures_iter(html) {
        if videos.len() >= max_results {
            break;
        }
        let video_id = &caps[1];
        let title = &caps[2];
        if seen_ids.contains(&video_id.to_string()) {
            continue;
        }
        seen_ids.push(video_id.to_string());
        videos.push(VideoTutorial {
            title: title.to_string(),
            url: format!("{base_url}/watch?v={video_id}"),
            duration: None,
            thumbnail: Some(format!(
                "https://img.youtube.com/vi/{video_id}/maxresdefault.jpg"
            )),
            channel: None,
            views: None,
        });
    }
    videos
}

// Fallback for the (rare) server-rendered page variant with plain links.
fn extract_anchor_videos(html: &str, base_url: &str, max_results: usize) -> Vec<VideoTutorial> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href*='/watch?v=']").expect("static selector");

    let mut videos = Vec::new();
    for element in document.select(&link_selector) {
        if videos.len() >= max_results {
            break;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let title = element
            .value()
            .attr("title")
            .unwrap_or("Recipe Video")
            .to_string();
        videos.push(VideoTutorial {
            title,
            url: format!("{base_url}{href}"),
            duration: None,
            thumbnail: None,
            channel: None,
            views: None,
        });
    }
    videos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_initial_data_videos() {
        let html = r#"var ytInitialData = {"contents":[
            {"videoId":"abc123","thumbnail":{},"title":{"runs":[{"text":"Best Curry Ever"}]}},
            {"videoId":"abc123","thumbnail":{},"title":{"runs":[{"text":"Best Curry Ever"}]}},
            {"videoId":"def456","thumbnail":{},"title":{"runs":[{"text":"Quick Toast"}]}}
        ]};"#;

        let videos = extract_initial_data_videos(html, "https://www.youtube.com", 5);

        assert_eq!(videos.len(), 2, "duplicate video ids should collapse");
        assert_eq!(videos[0].title, "Best Curry Ever");
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(
            videos[0].thumbnail.as_deref(),
            Some("https://img.youtube.com/vi/abc123/maxresdefault.jpg")
        );
    }

    #[test]
    fn test_extract_initial_data_respects_max_results() {
        let html = r#"
            {"videoId":"a1","title":{"runs":[{"text":"One"}]}}
            {"videoId":"a2","title":{"runs":[{"text":"Two"}]}}
            {"videoId":"a3","title":{"runs":[{"text":"Three"}]}}
        "#;
        let videos = extract_initial_data_videos(html, "https://www.youtube.com", 2);
        assert_eq!(videos.len(), 2);
    }

    #[test]
    fn test_anchor_fallback() {
        let html = r#"
            <html><body>
            <a href="/watch?v=xyz" title="Pasta Night">Pasta Night</a>
            <a href="/playlist?list=1">not a video</a>
            </body></html>
        "#;
        let videos = extract_anchor_videos(html, "https://www.youtube.com", 5);

        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "Pasta Night");
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=xyz");
    }
}
