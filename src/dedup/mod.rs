// src/dedup/mod.rs

//! Duplicate detection against article history.
//!
//! An article is a duplicate when its URL (raw or canonical) is already
//! stored, or when its body hashes or scores close enough to a recent
//! stored article. History failures never stop a run: the affected check
//! reports "not duplicate" and the article goes through.

pub mod similarity;

use std::fmt;

use crate::models::{Article, DeduplicationConfig};
use crate::storage::HistorySource;
use crate::utils::{normalize_content, normalize_url, truncate_chars};

pub use similarity::{content_hash, content_similarity, similarity_upper_bound, url_similarity};

use similarity::{hash_normalized, normalized_ratio};

/// Which form of the URL was found in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlForm {
    Raw,
    Normalized,
}

/// Why an article was (or was not) classified as a duplicate.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckReason {
    /// URL already stored
    UrlSeen { form: UrlForm, url: String },
    /// Normalized body hashes to a stored article's hash
    ExactContent { hash: String },
    /// Body similarity reached the threshold
    SimilarContent { similarity: f64, title: String },
    /// Repeats an earlier article of the same batch
    SeenInBatch { title: String },
    /// Nothing matched
    Unique,
    /// No history backend configured
    HistoryUnavailable,
    /// The backend failed while checking
    HistoryCheckFailed { phase: &'static str, message: String },
    /// Deduplication is switched off
    Disabled,
}

impl fmt::Display for CheckReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckReason::UrlSeen {
                form: UrlForm::Raw,
                url,
            } => write!(f, "URL already seen: {url}"),
            CheckReason::UrlSeen {
                form: UrlForm::Normalized,
                url,
            } => write!(f, "Normalized URL already seen: {url}"),
            CheckReason::ExactContent { hash } => {
                write!(f, "Exact content match (hash: {}...)", &hash[..hash.len().min(8)])
            }
            CheckReason::SimilarContent { similarity, title } => {
                write!(f, "Similar content (similarity: {similarity:.2}) to: {title}...")
            }
            CheckReason::SeenInBatch { title } => {
                write!(f, "Repeats earlier article in this batch: {title}")
            }
            CheckReason::Unique => write!(f, "unique"),
            CheckReason::HistoryUnavailable => write!(f, "history unavailable"),
            CheckReason::HistoryCheckFailed { phase, message } => {
                write!(f, "history check failed ({phase}): {message}")
            }
            CheckReason::Disabled => write!(f, "deduplication disabled"),
        }
    }
}

/// Outcome of checking one article.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCheck {
    pub duplicate: bool,
    pub reason: CheckReason,
}

impl DuplicateCheck {
    fn duplicate(reason: CheckReason) -> Self {
        Self {
            duplicate: true,
            reason,
        }
    }

    fn unique(reason: CheckReason) -> Self {
        Self {
            duplicate: false,
            reason,
        }
    }
}

/// Article fingerprint computed once per article.
struct Fingerprint {
    normalized_url: String,
    normalized_content: String,
    hash: String,
}

impl Fingerprint {
    fn of(article: &Article) -> Self {
        let normalized_content = normalize_content(&article.content);
        Self {
            normalized_url: normalize_url(&article.url),
            hash: hash_normalized(&normalized_content),
            normalized_content,
        }
    }
}

/// Classifies articles against history using injected thresholds.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    config: DeduplicationConfig,
}

impl Deduplicator {
    pub fn new(config: DeduplicationConfig) -> Self {
        Self { config }
    }

    /// Check a single article against history.
    pub async fn is_duplicate(
        &self,
        article: &Article,
        history: Option<&dyn HistorySource>,
    ) -> DuplicateCheck {
        if !self.config.enabled {
            return DuplicateCheck::unique(CheckReason::Disabled);
        }
        let Some(history) = history else {
            return DuplicateCheck::unique(CheckReason::HistoryUnavailable);
        };

        let fingerprint = Fingerprint::of(article);
        let mut failure = None;

        match self.check_url(article, &fingerprint, history).await {
            Ok(Some(reason)) => return DuplicateCheck::duplicate(reason),
            Ok(None) => {}
            Err(reason) => failure = Some(reason),
        }

        match self.check_content(&fingerprint, history).await {
            Ok(Some(reason)) => DuplicateCheck::duplicate(reason),
            Ok(None) => DuplicateCheck::unique(failure.unwrap_or(CheckReason::Unique)),
            Err(reason) => DuplicateCheck::unique(reason),
        }
    }

    async fn check_url(
        &self,
        article: &Article,
        fingerprint: &Fingerprint,
        history: &dyn HistorySource,
    ) -> std::result::Result<Option<CheckReason>, CheckReason> {
        if let Some(hit) = Self::lookup_url(history, &article.url, UrlForm::Raw).await? {
            return Ok(Some(hit));
        }
        if fingerprint.normalized_url != article.url {
            return Self::lookup_url(history, &fingerprint.normalized_url, UrlForm::Normalized)
                .await;
        }
        Ok(None)
    }

    async fn lookup_url(
        history: &dyn HistorySource,
        url: &str,
        form: UrlForm,
    ) -> std::result::Result<Option<CheckReason>, CheckReason> {
        match history.exists_by_url(url).await {
            Ok(true) => Ok(Some(CheckReason::UrlSeen {
                form,
                url: url.to_string(),
            })),
            Ok(false) => Ok(None),
            Err(e) => {
                log::warn!("URL history check failed for {}: {}", url, e);
                Err(CheckReason::HistoryCheckFailed {
                    phase: "url",
                    message: e.to_string(),
                })
            }
        }
    }

    async fn check_content(
        &self,
        fingerprint: &Fingerprint,
        history: &dyn HistorySource,
    ) -> std::result::Result<Option<CheckReason>, CheckReason> {
        if fingerprint.normalized_content.is_empty() {
            return Ok(None);
        }

        let recent = history
            .recent_articles(self.config.load_existing_days, self.config.history_limit)
            .await
            .map_err(|e| {
                log::warn!("Content history check failed: {}", e);
                CheckReason::HistoryCheckFailed {
                    phase: "content",
                    message: e.to_string(),
                }
            })?;

        let threshold = self.config.content_similarity_threshold;
        for existing in &recent {
            let existing_content = normalize_content(&existing.content);
            if existing_content.is_empty() {
                continue;
            }

            if hash_normalized(&existing_content) == fingerprint.hash {
                return Ok(Some(CheckReason::ExactContent {
                    hash: fingerprint.hash.clone(),
                }));
            }

            if similarity_upper_bound(&fingerprint.normalized_content, &existing_content)
                < threshold
            {
                continue;
            }

            let similarity = normalized_ratio(&fingerprint.normalized_content, &existing_content);
            if similarity >= threshold {
                return Ok(Some(CheckReason::SimilarContent {
                    similarity,
                    title: truncate_chars(&existing.title, 50),
                }));
            }
        }

        Ok(None)
    }

    /// Whether `candidate` repeats one of the already kept articles.
    fn repeats_in_batch(
        &self,
        candidate: &Fingerprint,
        kept: &[(Fingerprint, String)],
    ) -> Option<CheckReason> {
        kept.iter().find_map(|(earlier, title)| {
            let same_hash =
                !candidate.normalized_content.is_empty() && candidate.hash == earlier.hash;
            let same_url = candidate.normalized_url == earlier.normalized_url;
            (same_hash || same_url).then(|| CheckReason::SeenInBatch {
                title: truncate_chars(title, 50),
            })
        })
    }

    /// Filter a batch down to articles not seen before, preserving order.
    ///
    /// Disabled deduplication returns the batch unchanged. Repeats inside the
    /// batch itself are only dropped when `within_batch` is set.
    pub async fn deduplicate_batch(
        &self,
        articles: Vec<Article>,
        history: Option<&dyn HistorySource>,
    ) -> Vec<Article> {
        if !self.config.enabled {
            log::debug!("Deduplication disabled, keeping {} articles", articles.len());
            return articles;
        }

        let total = articles.len();
        let mut kept_fingerprints: Vec<(Fingerprint, String)> = Vec::new();
        let mut unique = Vec::with_capacity(total);

        for article in articles {
            if self.config.within_batch {
                let fingerprint = Fingerprint::of(&article);
                if let Some(reason) = self.repeats_in_batch(&fingerprint, &kept_fingerprints) {
                    log::info!("Skipping duplicate '{}': {}", article.short_title(), reason);
                    continue;
                }
                kept_fingerprints.push((fingerprint, article.title.clone()));
            }

            let check = self.is_duplicate(&article, history).await;
            if check.duplicate {
                log::info!(
                    "Skipping duplicate '{}': {}",
                    article.short_title(),
                    check.reason
                );
                if self.config.within_batch {
                    kept_fingerprints.pop();
                }
            } else {
                log::debug!("Keeping '{}': {}", article.short_title(), check.reason);
                unique.push(article);
            }
        }

        log::info!("Deduplication kept {}/{} articles", unique.len(), total);
        unique
    }
}
