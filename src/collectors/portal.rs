// src/collectors/portal.rs

//! Huatu education portal collector.
//!
//! Reads the announcement listing for the configured region and fetches the
//! linked detail pages.

use std::collections::HashSet;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::collectors::page::{self, MAX_CONTENT_CHARS, parse_selector};
use crate::collectors::{Collector, PageFetcher};
use crate::error::{AppError, Result};
use crate::models::{Article, HuatuConfig};
use crate::utils::truncate_with_ellipsis;

/// Source label for every portal article.
pub const PORTAL_SOURCE: &str = "华图教育网";

const FALLBACK_TITLE: &str = "华图教育网文章";
const LISTING_SELECTOR: &str = "ul.clear li a";
const BODY_SELECTORS: &[&str] = &["div.article-content", "div.content", "body"];

/// Topic keyword routed to the Guangdong civil-service listing.
const GUANGDONG_TOPIC: &str = "广东考公";
const GUANGDONG_PATH: &str = "gdgwy/";

pub struct PortalCollector {
    fetcher: PageFetcher,
    base_url: Url,
    topic: Option<String>,
    limit: usize,
}

impl PortalCollector {
    pub fn new(fetcher: PageFetcher, config: &HuatuConfig, topic: Option<&str>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "huatu.base_url is not a base URL: {}",
                config.base_url
            )));
        }

        Ok(Self {
            fetcher,
            base_url,
            topic: topic.map(str::to_string),
            limit: config.num_results.min(config.max_articles),
        })
    }

    /// Listing page for the configured topic.
    pub fn listing_url(&self) -> Url {
        let regional = self
            .topic
            .as_deref()
            .is_some_and(|t| t.contains(GUANGDONG_TOPIC));
        let path = if regional { GUANGDONG_PATH } else { "" };
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }
}

#[async_trait]
impl Collector for PortalCollector {
    fn name(&self) -> &str {
        "huatu"
    }

    async fn fetch_articles(&self) -> Result<Vec<Article>> {
        let listing_url = self.listing_url();
        log::info!("Reading portal listing {}", listing_url);

        let listing = self
            .fetcher
            .fetch(listing_url.as_str())
            .await
            .map_err(|e| AppError::collect(self.name(), e))?;
        let links = extract_listing_links(&listing, &listing_url, self.limit);

        if links.is_empty() {
            log::warn!("Portal listing {} has no article links", listing_url);
            return Ok(Vec::new());
        }

        let batch = self.fetcher.fetch_each(links, parse_detail).await;
        log::info!(
            "Collected {} portal articles ({} pages failed)",
            batch.items.len(),
            batch.failures
        );
        Ok(batch.items)
    }
}

/// Article links on a listing page, falling back to any `.html` link.
pub fn extract_listing_links(html: &str, listing_url: &Url, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);

    let listed = collect_links(&document, LISTING_SELECTOR, listing_url, limit, |_| true);
    if !listed.is_empty() {
        return listed;
    }

    collect_links(&document, "a[href]", listing_url, limit, |href| {
        href.ends_with(".html") || href.contains("/html/")
    })
}

fn collect_links(
    document: &Html,
    selector: &str,
    base: &Url,
    limit: usize,
    accept: impl Fn(&str) -> bool,
) -> Vec<String> {
    let Ok(selector) = parse_selector(selector) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && accept(href))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|url| url.to_string())
        .filter(|url| seen.insert(url.clone()))
        .take(limit)
        .collect()
}

/// Build an article from a portal detail page.
pub fn parse_detail(url: &str, html: &str) -> Option<Article> {
    let document = Html::parse_document(html);
    let body = page::first_text(&document, BODY_SELECTORS)?;
    let title = page::extract_title(&document).unwrap_or_else(|| FALLBACK_TITLE.to_string());

    Some(Article::new(
        title,
        url,
        truncate_with_ellipsis(&body, MAX_CONTENT_CHARS),
        PORTAL_SOURCE,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector(topic: Option<&str>) -> PortalCollector {
        let fetcher = PageFetcher::new(reqwest::Client::new(), &Default::default());
        PortalCollector::new(fetcher, &HuatuConfig::default(), topic).unwrap()
    }

    #[test]
    fn test_listing_url_by_topic() {
        assert_eq!(
            collector(Some("2026广东考公公告")).listing_url().as_str(),
            "https://www.huatu.com/gdgwy/"
        );
        assert_eq!(
            collector(None).listing_url().as_str(),
            "https://www.huatu.com/"
        );
    }

    #[test]
    fn test_limit_is_capped_by_max_articles() {
        let fetcher = PageFetcher::new(reqwest::Client::new(), &Default::default());
        let config = HuatuConfig {
            num_results: 20,
            max_articles: 3,
            ..HuatuConfig::default()
        };
        let collector = PortalCollector::new(fetcher, &config, None).unwrap();
        assert_eq!(collector.limit, 3);
    }

    #[test]
    fn test_extract_listing_links() {
        let html = r#"
<ul class="clear">
  <li><a href="/gdgwy/2026/0301/1.html">One</a></li>
  <li><a href="https://www.huatu.com/gdgwy/2026/0301/2.html">Two</a></li>
  <li><a href="/gdgwy/2026/0301/1.html">One again</a></li>
</ul>"#;
        let base = Url::parse("https://www.huatu.com/gdgwy/").unwrap();

        let links = extract_listing_links(html, &base, 5);
        assert_eq!(
            links,
            vec![
                "https://www.huatu.com/gdgwy/2026/0301/1.html",
                "https://www.huatu.com/gdgwy/2026/0301/2.html",
            ]
        );
    }

    #[test]
    fn test_extract_listing_links_fallback() {
        let html = r#"
<div>
  <a href="/about">About</a>
  <a href="news/3.html">Three</a>
  <a href="/html/2026/4">Four</a>
</div>"#;
        let base = Url::parse("https://www.huatu.com/").unwrap();

        let links = extract_listing_links(html, &base, 5);
        assert_eq!(
            links,
            vec![
                "https://www.huatu.com/news/3.html",
                "https://www.huatu.com/html/2026/4",
            ]
        );
    }

    #[test]
    fn test_parse_detail() {
        let html = r#"<html><head><title>省考公告</title></head>
<body><div class="nav">导航</div><div class="article-content">报名时间为3月1日至3月7日。</div></body></html>"#;

        let article = parse_detail("https://www.huatu.com/gdgwy/1.html", html).unwrap();
        assert_eq!(article.title, "省考公告");
        assert_eq!(article.content, "报名时间为3月1日至3月7日。");
        assert_eq!(article.source, PORTAL_SOURCE);
    }

    #[test]
    fn test_parse_detail_without_title() {
        let html = r#"<html><body><div class="content">正文</div></body></html>"#;
        let article = parse_detail("https://www.huatu.com/x.html", html).unwrap();
        assert_eq!(article.title, FALLBACK_TITLE);
    }
}
