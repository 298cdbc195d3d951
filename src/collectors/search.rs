// src/collectors/search.rs

//! Search-engine collector.
//!
//! Queries an HTML search endpoint for the configured topic, follows the top
//! result links and extracts an article from each page.

use std::collections::HashSet;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::collectors::page::{self, parse_selector};
use crate::collectors::{Collector, PageFetcher};
use crate::error::{AppError, Result};
use crate::models::{Article, SearchConfig};

/// Result link selectors, tried in order until one matches.
const RESULT_SELECTORS: &[&str] = &["a.result__a", "a.result-link", "h2 a[href]", "h3 a[href]"];

/// Query parameter carrying the real target of a redirect link.
const REDIRECT_PARAM: &str = "uddg";

pub struct SearchCollector {
    fetcher: PageFetcher,
    topic: String,
    num_results: usize,
    engine_url: Url,
}

impl SearchCollector {
    pub fn new(fetcher: PageFetcher, topic: String, config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            topic,
            num_results: config.num_results,
            engine_url: Url::parse(&config.search_engine_url)?,
        })
    }

    /// Search page URL for the topic.
    pub fn query_url(&self) -> Url {
        let mut url = self.engine_url.clone();
        url.query_pairs_mut().append_pair("q", &self.topic);
        url
    }
}

#[async_trait]
impl Collector for SearchCollector {
    fn name(&self) -> &str {
        "search"
    }

    async fn fetch_articles(&self) -> Result<Vec<Article>> {
        let query_url = self.query_url();
        log::info!("Searching '{}' via {}", self.topic, query_url);

        let results_page = self
            .fetcher
            .fetch(query_url.as_str())
            .await
            .map_err(|e| AppError::collect(self.name(), e))?;
        let links = extract_result_links(&results_page, &self.engine_url, self.num_results);

        if links.is_empty() {
            log::warn!("No search results for '{}'", self.topic);
            return Ok(Vec::new());
        }
        log::debug!("Following {} search results", links.len());

        let batch = self
            .fetcher
            .fetch_each(links, |url, html| page::extract_article(html, url))
            .await;

        log::info!(
            "Collected {} articles for '{}' ({} pages failed)",
            batch.items.len(),
            self.topic,
            batch.failures
        );
        Ok(batch.items)
    }
}

/// Target URLs of the result links on a search page, in page order.
///
/// Redirect links are unwrapped and links back into the search engine's own
/// domain are dropped.
pub fn extract_result_links(html: &str, engine_url: &Url, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let engine_host = engine_url.host_str().unwrap_or_default().to_lowercase();

    for s in RESULT_SELECTORS {
        let Ok(selector) = parse_selector(s) else {
            continue;
        };

        let mut seen = HashSet::new();
        let links: Vec<String> = document
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| engine_url.join(href).ok())
            .map(unwrap_redirect)
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .filter(|url| !is_same_site(url, &engine_host))
            .map(|url| url.to_string())
            .filter(|url| seen.insert(url.clone()))
            .take(limit)
            .collect();

        if !links.is_empty() {
            return links;
        }
    }

    Vec::new()
}

fn unwrap_redirect(url: Url) -> Url {
    let target = url
        .query_pairs()
        .find(|(name, _)| name == REDIRECT_PARAM)
        .and_then(|(_, target)| Url::parse(&target).ok());
    target.unwrap_or(url)
}

fn is_same_site(url: &Url, engine_host: &str) -> bool {
    let Some(host) = url.host_str().map(str::to_lowercase) else {
        return false;
    };
    host == engine_host || engine_host.ends_with(&format!(".{host}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"
<html><body>
  <div class="result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexam.example.com%2Fnotice%2F1&rut=abc">Notice 1</a>
  </div>
  <div class="result">
    <a class="result__a" href="https://news.example.org/story">Story</a>
  </div>
  <div class="result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexam.example.com%2Fnotice%2F1&rut=def">Notice 1 again</a>
  </div>
  <div class="result">
    <a class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Ad</a>
  </div>
  <div class="result">
    <a class="result__a" href="https://third.example.net/">Third</a>
  </div>
</body></html>"#;

    fn engine() -> Url {
        Url::parse("https://html.duckduckgo.com/html/").unwrap()
    }

    #[test]
    fn test_extract_result_links() {
        let links = extract_result_links(RESULTS, &engine(), 5);
        assert_eq!(
            links,
            vec![
                "https://exam.example.com/notice/1",
                "https://news.example.org/story",
                "https://third.example.net/",
            ]
        );
    }

    #[test]
    fn test_extract_result_links_limit() {
        let links = extract_result_links(RESULTS, &engine(), 1);
        assert_eq!(links, vec!["https://exam.example.com/notice/1"]);
    }

    #[test]
    fn test_extract_result_links_fallback_selector() {
        let html = r#"<html><body><h3><a href="https://a.example.com/x">A</a></h3></body></html>"#;
        let links = extract_result_links(html, &engine(), 5);
        assert_eq!(links, vec!["https://a.example.com/x"]);
    }

    #[test]
    fn test_query_url_encodes_topic() {
        let client = reqwest::Client::new();
        let fetcher = PageFetcher::new(client, &Default::default());
        let collector =
            SearchCollector::new(fetcher, "广东 考公".to_string(), &SearchConfig::default())
                .unwrap();

        let url = collector.query_url();
        let topic: Vec<_> = url.query_pairs().filter(|(k, _)| k == "q").collect();
        assert_eq!(topic[0].1, "广东 考公");
    }
}
