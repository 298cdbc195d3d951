// src/pipeline/strategy.rs

//! Collection strategy selection.
//!
//! One run draws articles from exactly one source. Candidates are derived
//! from the config in precedence order (portal, then search, then feeds) and
//! each carries its own fallback rule.

use std::fmt;

use crate::collectors::Collector;
use crate::dedup::Deduplicator;
use crate::error::{AppError, Result};
use crate::models::{Article, Config};
use crate::storage::HistorySource;
use crate::utils::log;

/// Which kind of collector to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Education portal scraper
    Portal,
    /// Search-engine scraping for a topic
    Search { topic: String },
    /// RSS feeds
    Feed { urls: Vec<String> },
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Portal => write!(f, "education portal"),
            Strategy::Search { topic } => write!(f, "search for '{topic}'"),
            Strategy::Feed { urls } => write!(f, "{} RSS feed(s)", urls.len()),
        }
    }
}

/// What happens when a candidate fails or finds nothing new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Move on to the next candidate
    TryNext,
    /// End collection with this candidate's result
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub strategy: Strategy,
    pub fallback: Fallback,
}

/// Builds the collector for a strategy.
pub trait CollectorFactory: Send + Sync {
    fn build(&self, strategy: &Strategy) -> Result<Box<dyn Collector>>;
}

/// Result of the collection stage.
#[derive(Debug)]
pub enum CollectOutcome {
    /// Articles that survived deduplication (possibly none)
    Collected {
        strategy: Strategy,
        raw_count: usize,
        articles: Vec<Article>,
    },
    /// No source is configured
    NothingToCollect,
    /// The deciding collector failed
    Failed { strategy: Strategy, error: AppError },
}

/// Ordered candidate list derived from the config.
pub fn candidates(config: &Config) -> Vec<Candidate> {
    let mut list = Vec::new();

    if config.huatu.enabled {
        list.push(Candidate {
            strategy: Strategy::Portal,
            fallback: Fallback::TryNext,
        });
    }

    if let Some(topic) = config.search.topic() {
        list.push(Candidate {
            strategy: Strategy::Search {
                topic: topic.to_string(),
            },
            fallback: Fallback::Stop,
        });
    } else {
        let urls = config.search.feed_urls();
        if !urls.is_empty() {
            list.push(Candidate {
                strategy: Strategy::Feed { urls },
                fallback: Fallback::Stop,
            });
        }
    }

    list
}

/// Runs the candidates in order and deduplicates the deciding result.
pub struct StrategySelector<'a> {
    candidates: Vec<Candidate>,
    factory: &'a dyn CollectorFactory,
    deduplicator: &'a Deduplicator,
    history: Option<&'a dyn HistorySource>,
}

impl<'a> StrategySelector<'a> {
    pub fn new(
        config: &Config,
        factory: &'a dyn CollectorFactory,
        deduplicator: &'a Deduplicator,
        history: Option<&'a dyn HistorySource>,
    ) -> Self {
        Self {
            candidates: candidates(config),
            factory,
            deduplicator,
            history,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Strategy tried first, if any.
    pub fn primary(&self) -> Option<&Strategy> {
        self.candidates.first().map(|c| &c.strategy)
    }

    async fn fetch(&self, strategy: &Strategy) -> Result<Vec<Article>> {
        let collector = self.factory.build(strategy)?;
        collector.fetch_articles().await
    }

    /// Collect from the first candidate that settles the run.
    pub async fn collect(&self) -> CollectOutcome {
        let total = self.candidates.len();

        for (index, candidate) in self.candidates.iter().enumerate() {
            let strategy = &candidate.strategy;
            let can_fall_through = candidate.fallback == Fallback::TryNext && index + 1 < total;
            log::info(&format!("Collecting via {strategy}"));

            match self.fetch(strategy).await {
                Ok(raw) => {
                    let raw_count = raw.len();
                    let articles = self.deduplicator.deduplicate_batch(raw, self.history).await;

                    if articles.is_empty() && can_fall_through {
                        log::info(&format!(
                            "{strategy} produced nothing new ({raw_count} collected), trying next source"
                        ));
                        continue;
                    }

                    return CollectOutcome::Collected {
                        strategy: strategy.clone(),
                        raw_count,
                        articles,
                    };
                }
                Err(error) if can_fall_through => {
                    log::warn(&format!("{strategy} failed: {error}. Trying next source"));
                }
                Err(error) => {
                    return CollectOutcome::Failed {
                        strategy: strategy.clone(),
                        error,
                    };
                }
            }
        }

        CollectOutcome::NothingToCollect
    }
}
