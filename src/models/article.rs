// src/models/article.rs

//! Article, processed article and digest data structures.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::utils::text::truncate_chars;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A raw item produced by a collector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Opaque identifier, unique for the lifetime of storage
    #[serde(default = "new_id")]
    pub id: String,

    /// Article title
    pub title: String,

    /// Link to the article as reported by the source
    pub url: String,

    /// Body text (possibly truncated by the collector)
    pub content: String,

    /// Human-readable origin label
    pub source: String,

    /// Publication time, when the source supplies one
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    /// Ingestion time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Create an article stamped with a fresh id and the current time.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            url: url.into(),
            content: content.into(),
            source: source.into(),
            published_at: None,
            created_at: Utc::now(),
        }
    }

    /// Attach a publication time.
    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Short form of the title for log lines.
    pub fn short_title(&self) -> String {
        truncate_chars(&self.title, 50)
    }
}

/// An article enriched by the language model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedArticle {
    #[serde(default = "new_id")]
    pub id: String,

    /// Full copy of the article at processing time
    pub original_article: Article,

    pub summary: String,

    /// Presentation-ordered key points
    #[serde(default)]
    pub key_points: Vec<String>,

    /// Sentiment in [-1.0, 1.0]
    #[serde(default)]
    pub sentiment: Option<f64>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "Utc::now")]
    pub processed_at: DateTime<Utc>,
}

impl ProcessedArticle {
    /// Create a processed article stamped with a fresh id and the current time.
    pub fn new(original_article: Article, summary: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            original_article,
            summary: summary.into(),
            key_points: Vec::new(),
            sentiment: None,
            tags: Vec::new(),
            processed_at: Utc::now(),
        }
    }

    /// Build a processed article from the model's JSON reply.
    ///
    /// The reply must be a JSON object. Missing fields fall back to empty
    /// values; a sentiment that is not a number (or numeric string) is dropped
    /// and finite values are clamped to [-1.0, 1.0].
    pub fn from_llm_response(original_article: Article, response_text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(response_text.trim()).map_err(|e| {
            log::error!(
                "Invalid JSON reply for article '{}': {}",
                original_article.short_title(),
                e
            );
            AppError::llm(format!("invalid JSON response: {e}"))
        })?;

        let object = value
            .as_object()
            .ok_or_else(|| AppError::llm("response is not a JSON object"))?;

        let summary = object
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut processed = Self::new(original_article, summary);
        processed.key_points = string_list(object.get("key_points"));
        processed.tags = string_list(object.get("tags"));
        processed.sentiment = object.get("sentiment").and_then(parse_sentiment);

        log::debug!(
            "Parsed model reply for '{}': {} key points, {} tags",
            processed.original_article.short_title(),
            processed.key_points.len(),
            processed.tags.len()
        );

        Ok(processed)
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_sentiment(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    raw.is_finite().then(|| raw.clamp(-1.0, 1.0))
}

/// A batch of processed articles delivered in one notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Digest {
    #[serde(default = "new_id")]
    pub id: String,

    pub title: String,

    /// Articles in notification order
    pub articles: Vec<ProcessedArticle>,

    /// Cross-article summary, only for multi-article runs
    #[serde(default)]
    pub overall_summary: Option<String>,

    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl Digest {
    /// Assemble a digest, deriving the title from the app name and local time.
    pub fn new(
        app_name: &str,
        roundup_label: &str,
        articles: Vec<ProcessedArticle>,
        overall_summary: Option<String>,
    ) -> Self {
        let title = Self::title_for(
            app_name,
            roundup_label,
            overall_summary.is_some(),
            Local::now(),
        );

        Self {
            id: new_id(),
            title,
            articles,
            overall_summary,
            generated_at: Utc::now(),
        }
    }

    /// Title pattern: `{app} - {time}`, or `{app} - {label} - {time}` for roundups.
    pub fn title_for(
        app_name: &str,
        roundup_label: &str,
        has_overall_summary: bool,
        at: DateTime<Local>,
    ) -> String {
        let stamp = at.format("%Y-%m-%d %H:%M");
        if has_overall_summary {
            format!("{app_name} - {roundup_label} - {stamp}")
        } else {
            format!("{app_name} - {stamp}")
        }
    }
}
