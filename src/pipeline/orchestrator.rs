// src/pipeline/orchestrator.rs

//! One end-to-end run: collect, deduplicate, summarize, persist, notify.

use futures::stream::{self, StreamExt};

use crate::dedup::Deduplicator;
use crate::error::{AppError, Result};
use crate::models::{Article, Config, Digest, ProcessedArticle};
use crate::notifiers::Notifier;
use crate::processors::Summarizer;
use crate::storage::{ArticleStore, HistorySource};
use crate::utils::log;

use super::strategy::{CollectOutcome, CollectorFactory, StrategySelector};

const TOTAL_STEPS: usize = 4;

/// Wires the collaborators of a run together.
///
/// The same pipeline may be run repeatedly; the only state carried between
/// runs lives in the attached storage.
pub struct Pipeline<'a> {
    config: &'a Config,
    factory: &'a dyn CollectorFactory,
    deduplicator: Deduplicator,
    summarizer: &'a dyn Summarizer,
    notifier: Option<&'a dyn Notifier>,
    history: Option<&'a dyn HistorySource>,
    store: Option<&'a dyn ArticleStore>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        factory: &'a dyn CollectorFactory,
        summarizer: &'a dyn Summarizer,
    ) -> Self {
        Self {
            config,
            factory,
            deduplicator: Deduplicator::new(config.deduplication.clone()),
            summarizer,
            notifier: None,
            history: None,
            store: None,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Attach a backend used both as dedup history and as the record store.
    /// Ignored when `database.enabled` is false.
    pub fn with_storage<S: ArticleStore>(mut self, storage: &'a S) -> Self {
        if self.config.database.enabled {
            self.history = Some(storage);
            self.store = Some(storage);
        } else {
            log::debug("Storage disabled, running without history");
        }
        self
    }

    /// Execute one run.
    ///
    /// Returns `Ok(None)` when there is nothing to send. Only a missing
    /// notifier and a failed delivery are errors.
    pub async fn run(&self) -> Result<Option<Digest>> {
        let notifier = self.notifier.ok_or_else(|| {
            AppError::config("no notification channel configured (add an [email] section)")
        })?;

        log::header(&format!("{} - collecting", self.config.app_name));

        // Step 1: Collect + dedup
        log::step(1, TOTAL_STEPS, "Collect - Fetching and filtering articles");
        let selector =
            StrategySelector::new(self.config, self.factory, &self.deduplicator, self.history);
        let (strategy, raw_count, articles) = match selector.collect().await {
            CollectOutcome::Collected {
                strategy,
                raw_count,
                articles,
            } => (strategy, raw_count, articles),
            CollectOutcome::NothingToCollect => {
                log::warn("No source configured (enable huatu, set search.topic or add RSS feeds)");
                return Ok(None);
            }
            CollectOutcome::Failed { strategy, error } => {
                log::error(&format!("Collection via {strategy} failed: {error}"));
                return Ok(None);
            }
        };

        if raw_count == 0 {
            log::info(&format!("{strategy} returned no articles"));
            return Ok(None);
        }
        log::sub_item(&format!(
            "{strategy}: {raw_count} collected, {} new",
            articles.len()
        ));
        if articles.is_empty() {
            log::info("Every collected article has been seen before");
            return Ok(None);
        }

        // Step 2: Summarize
        log::step(2, TOTAL_STEPS, "Summarize - Processing articles");
        let processed = self.process_all(&articles).await;
        if processed.is_empty() {
            log::warn("No article could be processed");
            return Ok(None);
        }
        let overall_summary = self.overall_summary(&processed).await;

        let digest = Digest::new(
            &self.config.app_name,
            &self.config.digest.roundup_label,
            processed,
            overall_summary,
        );

        // Step 3: Persist
        log::step(3, TOTAL_STEPS, "Persist - Saving records");
        self.persist(&digest).await;

        // Step 4: Notify
        log::step(4, TOTAL_STEPS, "Notify - Sending digest");
        notifier.send(&digest).await?;

        log::separator();
        log::summary(
            "Run complete",
            &[
                ("Source", strategy.to_string()),
                ("Collected", raw_count.to_string()),
                ("New", articles.len().to_string()),
                ("Processed", digest.articles.len().to_string()),
            ],
        );
        log::success(&digest.title);

        Ok(Some(digest))
    }

    async fn process_all(&self, articles: &[Article]) -> Vec<ProcessedArticle> {
        let concurrency = self.config.llm.max_concurrent.max(1);

        let results: Vec<(&Article, Result<ProcessedArticle>)> = stream::iter(articles)
            .map(|article| async move { (article, self.summarizer.process_article(article).await) })
            .buffered(concurrency)
            .collect()
            .await;

        let mut processed = Vec::with_capacity(results.len());
        for (article, result) in results {
            match result {
                Ok(p) => {
                    log::sub_item(&format!("[OK] {}", article.short_title()));
                    processed.push(p);
                }
                Err(e) => log::warn(&format!("Dropping '{}': {e}", article.short_title())),
            }
        }
        processed
    }

    async fn overall_summary(&self, processed: &[ProcessedArticle]) -> Option<String> {
        if processed.len() < 2 {
            return None;
        }

        let originals: Vec<Article> = processed
            .iter()
            .map(|p| p.original_article.clone())
            .collect();

        match self.summarizer.summarize_many(&originals).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                log::warn(&format!("Overall summary failed: {e}"));
                None
            }
        }
    }

    async fn persist(&self, digest: &Digest) {
        let Some(store) = self.store else {
            log::sub_item("Storage disabled, skipping");
            return;
        };

        let mut failures = 0usize;
        for processed in &digest.articles {
            if let Err(e) = store.save_article(&processed.original_article).await {
                log::warn(&format!("Failed to save article: {e}"));
                failures += 1;
            }
            if let Err(e) = store.save_processed(processed).await {
                log::warn(&format!("Failed to save processed article: {e}"));
                failures += 1;
            }
        }
        if let Err(e) = store.save_digest(digest).await {
            log::warn(&format!("Failed to save digest: {e}"));
            failures += 1;
        }

        if failures == 0 {
            log::sub_item(&format!("Saved {} articles and the digest", digest.articles.len()));
        }
    }
}
