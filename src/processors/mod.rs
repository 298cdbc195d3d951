// src/processors/mod.rs

//! Article summarization.

pub mod llm;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Article, ProcessedArticle};

pub use llm::LlmProcessor;

/// Turns raw articles into processed ones.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize one article. Failures drop the article from the digest.
    async fn process_article(&self, article: &Article) -> Result<ProcessedArticle>;

    /// One summary across several articles.
    async fn summarize_many(&self, articles: &[Article]) -> Result<String>;
}
