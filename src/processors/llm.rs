// src/processors/llm.rs

//! Summarizer backed by an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Article, CrawlerConfig, LlmConfig, ProcessedArticle};
use crate::processors::Summarizer;
use crate::utils::text::strip_code_fence;
use crate::utils::truncate_chars;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes news articles.";

/// Per-article body cap inside a roundup prompt.
const ROUNDUP_ARTICLE_CHARS: usize = 1000;
const TRUNCATION_MARKER: &str = "...(content truncated)";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client producing processed articles.
pub struct LlmProcessor {
    client: reqwest::Client,
    endpoint: String,
    config: LlmConfig,
}

impl LlmProcessor {
    /// Build a processor. An empty API key is a configuration error.
    pub fn new(config: &LlmConfig, crawler: &CrawlerConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::config(
                "llm.api_key is empty (set it in the config file or OPENAI_API_KEY)",
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(&crawler.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.api_base_url.trim_end_matches('/')
            ),
            config: config.clone(),
        })
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::llm(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                truncate_chars(&body, 200)
            )));
        }

        Ok(message_content(&body))
    }
}

#[async_trait]
impl Summarizer for LlmProcessor {
    async fn process_article(&self, article: &Article) -> Result<ProcessedArticle> {
        let prompt = article_prompt(article);
        log::debug!("Prompt for '{}':\n{}", article.short_title(), prompt);

        let reply = self.chat(&prompt).await?;
        log::debug!("Reply for '{}':\n{}", article.short_title(), reply);

        ProcessedArticle::from_llm_response(article.clone(), strip_code_fence(&reply))
    }

    async fn summarize_many(&self, articles: &[Article]) -> Result<String> {
        if articles.is_empty() {
            return Err(AppError::llm("no articles to summarize"));
        }

        let reply = self.chat(&roundup_prompt(articles)).await?;
        Ok(roundup_summary(&reply))
    }
}

/// Assistant text from a chat completions body, or the raw body when the
/// shape is unexpected.
fn message_content(body: &str) -> String {
    serde_json::from_str::<ChatResponse>(body)
        .ok()
        .and_then(|r| r.choices.into_iter().next())
        .and_then(|c| c.message.content)
        .unwrap_or_else(|| body.to_string())
}

fn article_prompt(article: &Article) -> String {
    format!(
        "Summarize the following article and provide key points, sentiment, and relevant tags.\n\n\
         Title: {}\n\
         Content: {}\n\n\
         Please respond in the following JSON format:\n\
         {{\"summary\": \"...\", \"key_points\": [\"...\"], \"sentiment\": 0.0, \"tags\": [\"...\"]}}",
        article.title, article.content
    )
}

fn roundup_prompt(articles: &[Article]) -> String {
    let mut prompt = String::from(
        "Analyze the following articles together, extract the important information \
         and write one comprehensive summary.\n\n",
    );

    for (i, article) in articles.iter().enumerate() {
        let mut content = truncate_chars(&article.content, ROUNDUP_ARTICLE_CHARS);
        if content.len() < article.content.len() {
            content.push_str(TRUNCATION_MARKER);
        }
        prompt.push_str(&format!(
            "Article {}:\nTitle: {}\nContent: {}\n\n",
            i + 1,
            article.title,
            content
        ));
    }

    prompt.push_str(
        "Please respond in JSON with these fields:\n\
         {\"summary\": \"overall summary\", \
         \"key_points\": [\"point 1\", \"point 2\"], \
         \"important_dates\": [\"date: event\"], \
         \"advice\": \"advice for readers\"}",
    );
    prompt
}

/// The `summary` field of a roundup reply, or the whole reply when it is not
/// a JSON object with one.
fn roundup_summary(reply: &str) -> String {
    let text = strip_code_fence(reply);
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("summary").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.to_string())
}
