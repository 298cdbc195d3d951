// src/collectors/mod.rs

//! Article sources.
//!
//! Every source implements [`Collector`]. [`HttpCollectorFactory`] builds the
//! concrete collector for the strategy selected at the start of a run.

pub mod page;
pub mod portal;
pub mod rss;
pub mod search;

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Article, Config, CrawlerConfig};
use crate::pipeline::{CollectorFactory, Strategy};
use crate::utils::http::{create_async_client, fetch_text};

pub use portal::PortalCollector;
pub use self::rss::RssCollector;
pub use search::SearchCollector;

/// A source of raw articles.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch the current articles. An empty list is a valid result.
    async fn fetch_articles(&self) -> Result<Vec<Article>>;
}

/// Parsed pages plus a count of pages that could not be fetched.
#[derive(Debug)]
pub struct PageBatch<T> {
    pub items: Vec<T>,
    pub failures: usize,
}

/// Fetches pages with bounded, order-preserving concurrency.
#[derive(Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    concurrency: usize,
    delay: Duration,
}

impl PageFetcher {
    pub fn new(client: reqwest::Client, config: &CrawlerConfig) -> Self {
        Self {
            client,
            concurrency: config.max_concurrent.max(1),
            delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    /// Fetch a single page as text.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        fetch_text(&self.client, url).await
    }

    /// Fetch every URL and parse each body, keeping input order.
    ///
    /// Fetch failures are logged and counted; pages the parser rejects are
    /// dropped silently.
    pub async fn fetch_each<T, F>(&self, urls: Vec<String>, parse: F) -> PageBatch<T>
    where
        T: Send,
        F: Fn(&str, &str) -> Option<T> + Send + Sync,
    {
        let mut pages = stream::iter(urls)
            .map(|url| async move {
                let result = fetch_text(&self.client, &url).await;
                (url, result)
            })
            .buffered(self.concurrency);

        let mut batch = PageBatch {
            items: Vec::new(),
            failures: 0,
        };

        while let Some((url, result)) = pages.next().await {
            match result {
                Ok(body) => match parse(&url, &body) {
                    Some(item) => batch.items.push(item),
                    None => log::debug!("No usable content at {}", url),
                },
                Err(error) => {
                    batch.failures += 1;
                    log::warn!("Failed to fetch {}: {}", url, error);
                }
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        batch
    }
}

/// Builds network-backed collectors from the application config.
pub struct HttpCollectorFactory {
    fetcher: PageFetcher,
    config: Config,
}

impl HttpCollectorFactory {
    pub fn new(config: &Config) -> Result<Self> {
        let client = create_async_client(&config.crawler)?;
        Ok(Self {
            fetcher: PageFetcher::new(client, &config.crawler),
            config: config.clone(),
        })
    }
}

impl CollectorFactory for HttpCollectorFactory {
    fn build(&self, strategy: &Strategy) -> Result<Box<dyn Collector>> {
        let fetcher = self.fetcher.clone();
        let collector: Box<dyn Collector> = match strategy {
            Strategy::Portal => {
                let topic = self
                    .config
                    .huatu
                    .topic
                    .as_deref()
                    .or(self.config.search.topic());
                Box::new(PortalCollector::new(fetcher, &self.config.huatu, topic)?)
            }
            Strategy::Search { topic } => Box::new(SearchCollector::new(
                fetcher,
                topic.clone(),
                &self.config.search,
            )?),
            Strategy::Feed { urls } => Box::new(RssCollector::new(fetcher, urls.clone())),
        };
        Ok(collector)
    }
}
