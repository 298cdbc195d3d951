//! Local filesystem storage implementation.
//!
//! Each record kind lives in one pretty-printed JSON array. Writes go to a
//! temp file that is renamed over the target, and every read-modify-write
//! cycle runs under a process-local async lock so concurrent saves from the
//! same process never lose records.
//!
//! The parsed article history is cached in memory, so a run that checks many
//! articles against it parses `articles.json` once. Saving an article clears
//! the cache.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── articles.json
//! ├── processed.json
//! └── digests.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Article, Digest, ProcessedArticle};
use crate::storage::{ArticleStore, HistorySource, Record, append_unique, select_recent};

const ARTICLES_KEY: &str = "articles.json";
const PROCESSED_KEY: &str = "processed.json";
const DIGESTS_KEY: &str = "digests.json";

type ArticleCache = Arc<Mutex<Option<Arc<Vec<Article>>>>>;

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
    articles: ArticleCache,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Arc::new(Mutex::new(())),
            articles: Arc::new(Mutex::new(None)),
        }
    }

    /// Root directory holding the record files.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read a record array; a missing file is an empty history.
    async fn read_records<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::storage(format!("{key} is corrupt: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    /// Append one record to a file, skipping ids already stored.
    async fn append_record<T>(&self, key: &str, record: &T) -> Result<bool>
    where
        T: Record + Serialize + DeserializeOwned + Send + Sync,
    {
        let _guard = self.write_lock.lock().await;

        let mut records: Vec<T> = self.read_records(key).await?;
        if !append_unique(&mut records, record) {
            log::debug!("{} already holds record {}", key, record.record_id());
            return Ok(false);
        }

        self.write_json(key, &records).await?;
        if key == ARTICLES_KEY {
            self.articles.lock().await.take();
        }
        log::debug!("Stored record {} in {} ({} total)", record.record_id(), key, records.len());
        Ok(true)
    }

    /// Article history, parsed from disk on first use after a write.
    async fn cached_articles(&self) -> Result<Arc<Vec<Article>>> {
        let mut cache = self.articles.lock().await;
        if let Some(articles) = cache.as_ref() {
            return Ok(Arc::clone(articles));
        }

        let loaded: Arc<Vec<Article>> = Arc::new(self.read_records(ARTICLES_KEY).await?);
        *cache = Some(Arc::clone(&loaded));
        Ok(loaded)
    }
}

#[async_trait]
impl HistorySource for LocalStorage {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        let articles = self.cached_articles().await?;
        Ok(articles.iter().any(|a| a.url == url))
    }

    async fn recent_articles(&self, days: u32, limit: usize) -> Result<Vec<Article>> {
        let articles = self.cached_articles().await?;
        Ok(select_recent(&articles, days, limit))
    }
}

#[async_trait]
impl ArticleStore for LocalStorage {
    async fn save_article(&self, article: &Article) -> Result<bool> {
        self.append_record(ARTICLES_KEY, article).await
    }

    async fn save_processed(&self, processed: &ProcessedArticle) -> Result<bool> {
        self.append_record(PROCESSED_KEY, processed).await
    }

    async fn save_digest(&self, digest: &Digest) -> Result<bool> {
        self.append_record(DIGESTS_KEY, digest).await
    }

    async fn recent_processed(&self, days: u32, limit: usize) -> Result<Vec<ProcessedArticle>> {
        let processed: Vec<ProcessedArticle> = self.read_records(PROCESSED_KEY).await?;
        Ok(select_recent(&processed, days, limit))
    }

    async fn recent_digests(&self, days: u32, limit: usize) -> Result<Vec<Digest>> {
        let digests: Vec<Digest> = self.read_records(DIGESTS_KEY).await?;
        Ok(select_recent(&digests, days, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn article(title: &str, url: &str) -> Article {
        Article::new(title, url, "Registration opens next week.", "Test")
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!storage.path("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_empty_history() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested"));

        assert!(!storage.exists_by_url("https://example.com/a").await.unwrap());
        assert!(storage.recent_articles(7, 10).await.unwrap().is_empty());
        assert!(storage.recent_digests(7, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_article_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let a = article("Exam notice", "https://example.com/a");

        assert!(storage.save_article(&a).await.unwrap());
        assert!(!storage.save_article(&a).await.unwrap());

        let stored = storage.recent_articles(7, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(storage.exists_by_url("https://example.com/a").await.unwrap());
        assert!(!storage.exists_by_url("https://example.com/a/").await.unwrap());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let a = article("Exam notice", "https://example.com/a");
        let processed = ProcessedArticle::new(a.clone(), "Summary");
        let digest = Digest::new("App", "Roundup", vec![processed.clone()], None);

        {
            let storage = LocalStorage::new(tmp.path());
            storage.save_article(&a).await.unwrap();
            storage.save_processed(&processed).await.unwrap();
            storage.save_digest(&digest).await.unwrap();
        }

        let reopened = LocalStorage::new(tmp.path());
        let loaded = reopened.recent_processed(1, 10).await.unwrap();
        assert_eq!(loaded[0].original_article.url, "https://example.com/a");
        assert_eq!(reopened.recent_digests(1, 10).await.unwrap()[0].id, digest.id);
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_every_record() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    let a = article(&format!("n{i}"), &format!("https://example.com/{i}"));
                    storage.save_article(&a).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(storage.recent_articles(1, 100).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.write_bytes(ARTICLES_KEY, b"{not json").await.unwrap();

        let result = storage.recent_articles(7, 10).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn test_history_is_parsed_once_until_saved() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage
            .save_article(&article("Exam notice", "https://example.com/a"))
            .await
            .unwrap();
        assert_eq!(storage.recent_articles(7, 10).await.unwrap().len(), 1);

        // Cached lookups never touch the file again.
        tokio::fs::write(storage.path(ARTICLES_KEY), b"{not json")
            .await
            .unwrap();
        assert!(storage.exists_by_url("https://example.com/a").await.unwrap());
        assert_eq!(storage.recent_articles(7, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_saved_article_is_visible_to_history() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(!storage.exists_by_url("https://example.com/b").await.unwrap());

        storage
            .save_article(&article("Results", "https://example.com/b"))
            .await
            .unwrap();
        assert!(storage.exists_by_url("https://example.com/b").await.unwrap());
        assert_eq!(storage.recent_articles(7, 10).await.unwrap().len(), 1);
    }
}
