//! Storage abstractions for article history and run records.
//!
//! Two seams are exposed:
//! - [`HistorySource`]: the read side the deduplicator consults.
//! - [`ArticleStore`]: append-only persistence of articles, processed
//!   articles and digests, plus recent-record queries.
//!
//! ## Directory Structure (local backend)
//!
//! ```text
//! data/
//! ├── articles.json     # Raw articles, append-only
//! ├── processed.json    # Processed articles with their originals
//! └── digests.json      # Delivered digests
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{Article, Digest, ProcessedArticle};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Read access to previously seen articles.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Whether an article with exactly this URL is stored.
    async fn exists_by_url(&self, url: &str) -> Result<bool>;

    /// Articles created within the last `days` days, newest first, at most `limit`.
    async fn recent_articles(&self, days: u32, limit: usize) -> Result<Vec<Article>>;
}

/// Append-only persistence for run records.
///
/// Saving a record whose id is already stored is a no-op and returns `false`.
#[async_trait]
pub trait ArticleStore: HistorySource {
    async fn save_article(&self, article: &Article) -> Result<bool>;

    async fn save_processed(&self, processed: &ProcessedArticle) -> Result<bool>;

    async fn save_digest(&self, digest: &Digest) -> Result<bool>;

    /// Processed articles within the window, newest first.
    async fn recent_processed(&self, days: u32, limit: usize) -> Result<Vec<ProcessedArticle>>;

    /// Digests within the window, newest first.
    async fn recent_digests(&self, days: u32, limit: usize) -> Result<Vec<Digest>>;
}

/// Records that carry an id and a timestamp for window queries.
pub(crate) trait Record: Clone {
    fn record_id(&self) -> &str;
    fn stamp(&self) -> DateTime<Utc>;
}

impl Record for Article {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn stamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for ProcessedArticle {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn stamp(&self) -> DateTime<Utc> {
        self.processed_at
    }
}

impl Record for Digest {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn stamp(&self) -> DateTime<Utc> {
        self.generated_at
    }
}

/// Newest-first slice of `records` stamped within the last `days` days.
pub(crate) fn select_recent<T: Record>(records: &[T], days: u32, limit: usize) -> Vec<T> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let mut recent: Vec<T> = records
        .iter()
        .filter(|r| r.stamp() >= cutoff)
        .cloned()
        .collect();
    recent.sort_by(|a, b| b.stamp().cmp(&a.stamp()));
    recent.truncate(limit);
    recent
}

/// Append `record` unless its id is already present.
pub(crate) fn append_unique<T: Record>(records: &mut Vec<T>, record: &T) -> bool {
    if records.iter().any(|r| r.record_id() == record.record_id()) {
        return false;
    }
    records.push(record.clone());
    true
}
