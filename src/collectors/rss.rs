// src/collectors/rss.rs

//! RSS feed collector.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::collectors::page::MAX_CONTENT_CHARS;
use crate::collectors::{Collector, PageFetcher};
use crate::error::{AppError, Result};
use crate::models::Article;
use crate::utils::text::strip_html;
use crate::utils::truncate_with_ellipsis;

/// Collects the items of one or more RSS feeds.
pub struct RssCollector {
    fetcher: PageFetcher,
    feed_urls: Vec<String>,
}

impl RssCollector {
    pub fn new(fetcher: PageFetcher, feed_urls: Vec<String>) -> Self {
        Self {
            fetcher,
            feed_urls,
        }
    }
}

#[async_trait]
impl Collector for RssCollector {
    fn name(&self) -> &str {
        "rss"
    }

    async fn fetch_articles(&self) -> Result<Vec<Article>> {
        let batch = self
            .fetcher
            .fetch_each(self.feed_urls.clone(), |url, body| match parse_feed(body.as_bytes()) {
                Ok(articles) => Some(articles),
                Err(e) => {
                    log::warn!("Skipping feed {}: {}", url, e);
                    None
                }
            })
            .await;

        if batch.items.is_empty() && !self.feed_urls.is_empty() {
            return Err(AppError::collect(
                self.name(),
                format!("all {} feeds failed", self.feed_urls.len()),
            ));
        }

        let articles: Vec<Article> = batch.items.into_iter().flatten().collect();
        log::info!(
            "Collected {} articles from {} feeds",
            articles.len(),
            self.feed_urls.len()
        );
        Ok(articles)
    }
}

/// Parse an RSS document into articles. Items without a link are skipped.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Article>> {
    let channel = rss::Channel::read_from(bytes).map_err(|e| AppError::collect("rss", e))?;
    let channel_title = channel.title().trim().to_string();

    let articles = channel
        .items()
        .iter()
        .filter_map(|item| {
            let url = item.link()?.trim();
            if url.is_empty() {
                return None;
            }

            let title = item.title().map(str::trim).unwrap_or_default();
            let body = item
                .description()
                .or_else(|| item.content())
                .map(strip_html)
                .unwrap_or_default();
            let source = item
                .source()
                .and_then(|s| s.title())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(channel_title.as_str());
            let published_at = item
                .pub_date()
                .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
                .map(|d| d.with_timezone(&Utc));

            Some(
                Article::new(
                    title,
                    url,
                    truncate_with_ellipsis(&body, MAX_CONTENT_CHARS),
                    source,
                )
                .with_published_at(published_at),
            )
        })
        .collect();

    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Exam News</title>
    <link>https://news.example.com</link>
    <description>Updates</description>
    <item>
      <title>Registration opens</title>
      <link>https://news.example.com/1</link>
      <description>&lt;p&gt;Apply &lt;b&gt;online&lt;/b&gt; now&lt;/p&gt;</description>
      <pubDate>Mon, 02 Mar 2026 08:00:00 +0800</pubDate>
    </item>
    <item>
      <title>Mirrored item</title>
      <link>https://news.example.com/2</link>
      <source url="https://other.example.com/rss">Other Source</source>
    </item>
    <item>
      <title>No link</title>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_items() {
        let articles = parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "Registration opens");
        assert_eq!(first.url, "https://news.example.com/1");
        assert_eq!(first.content, "Apply online now");
        assert_eq!(first.source, "Exam News");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap())
        );

        let second = &articles[1];
        assert_eq!(second.source, "Other Source");
        assert_eq!(second.content, "");
        assert!(second.published_at.is_none());
    }

    #[test]
    fn test_parse_feed_invalid() {
        let result = parse_feed(b"<html>not a feed</html>");
        assert!(matches!(result, Err(AppError::Collect { .. })));
    }
}
