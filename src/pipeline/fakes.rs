//! In-test collaborators for the pipeline.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::collectors::Collector;
use crate::error::{AppError, Result};
use crate::models::{Article, Digest, ProcessedArticle};
use crate::notifiers::Notifier;
use crate::pipeline::{CollectorFactory, Strategy};
use crate::processors::Summarizer;
use crate::storage::{ArticleStore, HistorySource};

pub fn article(title: &str, url: &str) -> Article {
    Article::new(title, url, format!("{title}. ").repeat(20), "Fake")
}

type Scripted = std::result::Result<Vec<Article>, &'static str>;

/// Canned result for one strategy kind.
pub enum Script {
    Portal(Scripted),
    Search(Scripted),
    Feed(Scripted),
}

fn kind(strategy: &Strategy) -> &'static str {
    match strategy {
        Strategy::Portal => "portal",
        Strategy::Search { .. } => "search",
        Strategy::Feed { .. } => "feed",
    }
}

struct FixedCollector {
    name: &'static str,
    result: Scripted,
}

#[async_trait]
impl Collector for FixedCollector {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_articles(&self) -> Result<Vec<Article>> {
        self.result
            .clone()
            .map_err(|message| AppError::collect(self.name, message))
    }
}

/// Factory returning canned collectors and recording what was built.
#[derive(Default)]
pub struct ScriptedFactory {
    scripts: Vec<(&'static str, Scripted)>,
    built: Mutex<Vec<&'static str>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, script: Script) -> Self {
        let entry = match script {
            Script::Portal(result) => ("portal", result),
            Script::Search(result) => ("search", result),
            Script::Feed(result) => ("feed", result),
        };
        self.scripts.push(entry);
        self
    }

    pub fn built(&self) -> Vec<&'static str> {
        self.built.lock().unwrap().clone()
    }
}

impl CollectorFactory for ScriptedFactory {
    fn build(&self, strategy: &Strategy) -> Result<Box<dyn Collector>> {
        let name = kind(strategy);
        self.built.lock().unwrap().push(name);

        let result = self
            .scripts
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, r)| r.clone())
            .unwrap_or(Ok(Vec::new()));
        Ok(Box::new(FixedCollector { name, result }))
    }
}

/// Summarizer that echoes titles and fails on request.
#[derive(Default)]
pub struct FakeSummarizer {
    pub fail_titles: Vec<String>,
    pub fail_roundup: bool,
    pub roundup_calls: Mutex<usize>,
}

impl FakeSummarizer {
    pub fn failing_on(titles: &[&str]) -> Self {
        Self {
            fail_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn roundup_calls(&self) -> usize {
        *self.roundup_calls.lock().unwrap()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn process_article(&self, article: &Article) -> Result<ProcessedArticle> {
        if self.fail_titles.contains(&article.title) {
            return Err(AppError::llm(format!("refused '{}'", article.title)));
        }
        Ok(ProcessedArticle::new(
            article.clone(),
            format!("summary of {}", article.title),
        ))
    }

    async fn summarize_many(&self, articles: &[Article]) -> Result<String> {
        *self.roundup_calls.lock().unwrap() += 1;
        if self.fail_roundup {
            return Err(AppError::llm("roundup unavailable"));
        }
        Ok(format!("{} articles", articles.len()))
    }
}

/// Notifier that records every digest it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub sent: Mutex<Vec<Digest>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Digest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, digest: &Digest) -> Result<()> {
        if self.fail {
            return Err(AppError::email("smtp refused"));
        }
        self.sent.lock().unwrap().push(digest.clone());
        Ok(())
    }
}

/// Store with an empty history whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl HistorySource for FailingStore {
    async fn exists_by_url(&self, _url: &str) -> Result<bool> {
        Ok(false)
    }

    async fn recent_articles(&self, _days: u32, _limit: usize) -> Result<Vec<Article>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl ArticleStore for FailingStore {
    async fn save_article(&self, _article: &Article) -> Result<bool> {
        Err(AppError::storage("read-only volume"))
    }

    async fn save_processed(&self, _processed: &ProcessedArticle) -> Result<bool> {
        Err(AppError::storage("read-only volume"))
    }

    async fn save_digest(&self, _digest: &Digest) -> Result<bool> {
        Err(AppError::storage("read-only volume"))
    }

    async fn recent_processed(&self, _days: u32, _limit: usize) -> Result<Vec<ProcessedArticle>> {
        Ok(Vec::new())
    }

    async fn recent_digests(&self, _days: u32, _limit: usize) -> Result<Vec<Digest>> {
        Ok(Vec::new())
    }
}
