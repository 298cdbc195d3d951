//! In-process storage backend for ephemeral runs and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{Article, Digest, ProcessedArticle};
use crate::storage::{ArticleStore, HistorySource, append_unique, select_recent};

/// Keeps every record in memory for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStorage {
    articles: RwLock<Vec<Article>>,
    processed: RwLock<Vec<ProcessedArticle>>,
    digests: RwLock<Vec<Digest>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the history with existing articles.
    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: RwLock::new(articles),
            ..Self::default()
        }
    }

    pub async fn article_count(&self) -> usize {
        self.articles.read().await.len()
    }

    pub async fn processed_count(&self) -> usize {
        self.processed.read().await.len()
    }

    pub async fn digest_count(&self) -> usize {
        self.digests.read().await.len()
    }
}

#[async_trait]
impl HistorySource for MemoryStorage {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        Ok(self.articles.read().await.iter().any(|a| a.url == url))
    }

    async fn recent_articles(&self, days: u32, limit: usize) -> Result<Vec<Article>> {
        Ok(select_recent(self.articles.read().await.as_slice(), days, limit))
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn save_article(&self, article: &Article) -> Result<bool> {
        Ok(append_unique(&mut *self.articles.write().await, article))
    }

    async fn save_processed(&self, processed: &ProcessedArticle) -> Result<bool> {
        Ok(append_unique(&mut *self.processed.write().await, processed))
    }

    async fn save_digest(&self, digest: &Digest) -> Result<bool> {
        Ok(append_unique(&mut *self.digests.write().await, digest))
    }

    async fn recent_processed(&self, days: u32, limit: usize) -> Result<Vec<ProcessedArticle>> {
        Ok(select_recent(self.processed.read().await.as_slice(), days, limit))
    }

    async fn recent_digests(&self, days: u32, limit: usize) -> Result<Vec<Digest>> {
        Ok(select_recent(self.digests.read().await.as_slice(), days, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        let article = Article::new("Title", "https://example.com/x", "Body", "Test");

        assert!(storage.save_article(&article).await.unwrap());
        assert!(!storage.save_article(&article).await.unwrap());
        assert!(storage.exists_by_url("https://example.com/x").await.unwrap());
        assert_eq!(storage.article_count().await, 1);

        let processed = ProcessedArticle::new(article, "Summary");
        storage.save_processed(&processed).await.unwrap();
        assert_eq!(storage.recent_processed(1, 10).await.unwrap().len(), 1);
    }
}
