// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name used in digest titles and log headers
    #[serde(default = "defaults::app_name")]
    pub app_name: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub deduplication: DeduplicationConfig,

    /// Topic search and feed sources
    #[serde(default)]
    pub search: SearchConfig,

    /// Education portal collector
    #[serde(default)]
    pub huatu: HuatuConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    /// Notification channel; absent means the pipeline cannot run
    #[serde(default)]
    pub email: Option<EmailConfig>,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub digest: DigestConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply secrets from the environment on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.llm.api_key = key;
        }
        if let Some(email) = self.email.as_mut() {
            if let Some(password) = lookup("NEWSTRACKER_SMTP_PASSWORD") {
                email.password = password;
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(AppError::validation("llm.timeout_secs must be > 0"));
        }
        if self.llm.max_concurrent == 0 {
            return Err(AppError::validation("llm.max_concurrent must be > 0"));
        }
        self.deduplication.validate()?;
        if !self.has_collector() {
            return Err(AppError::validation(
                "No collector configured: enable huatu, set search.topic or add RSS feed URLs",
            ));
        }
        match &self.email {
            Some(email) => email.validate()?,
            None => return Err(AppError::validation("email section is missing")),
        }
        self.scheduler.validate()?;
        Ok(())
    }

    /// Whether any collection strategy can be selected.
    pub fn has_collector(&self) -> bool {
        self.huatu.enabled || self.search.topic().is_some() || !self.search.feed_urls().is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: defaults::app_name(),
            logging: LoggingConfig::default(),
            crawler: CrawlerConfig::default(),
            deduplication: DeduplicationConfig::default(),
            search: SearchConfig::default(),
            huatu: HuatuConfig::default(),
            llm: LlmConfig::default(),
            email: None,
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            digest: DigestConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between page fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Duplicate detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeduplicationConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Recognized and range-checked; URL checks compare the normalized form exactly
    #[serde(default = "defaults::url_similarity_threshold")]
    pub url_similarity_threshold: f64,

    #[serde(default = "defaults::content_similarity_threshold")]
    pub content_similarity_threshold: f64,

    /// Lookback window (days) for content comparison
    #[serde(default = "defaults::load_existing_days")]
    pub load_existing_days: u32,

    /// Maximum number of historical articles compared per check
    #[serde(default = "defaults::history_limit")]
    pub history_limit: usize,

    /// Also drop repeats inside one collected batch
    #[serde(default)]
    pub within_batch: bool,
}

impl DeduplicationConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("url_similarity_threshold", self.url_similarity_threshold),
            (
                "content_similarity_threshold",
                self.content_similarity_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::validation(format!(
                    "deduplication.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.history_limit == 0 {
            return Err(AppError::validation(
                "deduplication.history_limit must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            url_similarity_threshold: defaults::url_similarity_threshold(),
            content_similarity_threshold: defaults::content_similarity_threshold(),
            load_existing_days: defaults::load_existing_days(),
            history_limit: defaults::history_limit(),
            within_batch: false,
        }
    }
}

/// Topic search and RSS feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search topic; when set, search wins over feeds
    #[serde(default)]
    pub topic: Option<String>,

    /// Number of search results to fetch
    #[serde(default = "defaults::num_results")]
    pub num_results: usize,

    /// HTML search endpoint queried with `?q=<topic>`
    #[serde(default = "defaults::search_engine_url")]
    pub search_engine_url: String,

    /// Single feed (kept for older config files)
    #[serde(default)]
    pub rss_feed_url: Option<String>,

    /// Feed list; takes precedence over `rss_feed_url`
    #[serde(default)]
    pub rss_feed_urls: Vec<String>,
}

impl SearchConfig {
    /// The configured topic, if non-empty after trimming.
    pub fn topic(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Feed URLs to use: the list when non-empty, otherwise the single URL.
    pub fn feed_urls(&self) -> Vec<String> {
        let list: Vec<String> = self
            .rss_feed_urls
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if !list.is_empty() {
            return list;
        }
        self.rss_feed_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| vec![u.to_string()])
            .unwrap_or_default()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            topic: None,
            num_results: defaults::num_results(),
            search_engine_url: defaults::search_engine_url(),
            rss_feed_url: None,
            rss_feed_urls: Vec::new(),
        }
    }
}

/// Education portal (huatu.com) collector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuatuConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Subscription topic; picks the regional listing page
    #[serde(default)]
    pub topic: Option<String>,

    /// Number of listing links to follow
    #[serde(default = "defaults::num_results")]
    pub num_results: usize,

    /// Upper bound on articles fetched per run
    #[serde(default = "defaults::max_articles")]
    pub max_articles: usize,

    #[serde(default = "defaults::huatu_base_url")]
    pub base_url: String,
}

impl Default for HuatuConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            topic: None,
            num_results: defaults::num_results(),
            max_articles: defaults::max_articles(),
            base_url: defaults::huatu_base_url(),
        }
    }
}

/// Language model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; usually supplied through OPENAI_API_KEY
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "defaults::llm_model")]
    pub model: String,

    /// OpenAI-compatible base URL
    #[serde(default = "defaults::llm_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "defaults::llm_temperature")]
    pub temperature: f32,

    #[serde(default = "defaults::llm_max_tokens")]
    pub max_tokens: u32,

    /// Articles summarized at once
    #[serde(default = "defaults::llm_max_concurrent")]
    pub max_concurrent: usize,

    /// Client timeout for model calls, in seconds
    #[serde(default = "defaults::llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: defaults::llm_model(),
            api_base_url: defaults::llm_api_base_url(),
            temperature: defaults::llm_temperature(),
            max_tokens: defaults::llm_max_tokens(),
            max_concurrent: defaults::llm_max_concurrent(),
            timeout_secs: defaults::llm_timeout(),
        }
    }
}

/// SMTP delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,

    /// 465 uses implicit TLS, anything else STARTTLS
    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    pub username: String,

    #[serde(default)]
    pub password: String,

    pub sender_email: String,

    /// Comma-separated recipient list
    pub recipient_emails: String,
}

impl EmailConfig {
    /// Recipients split on commas, blanks removed.
    pub fn recipients(&self) -> Vec<String> {
        self.recipient_emails
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.smtp_server.trim().is_empty() {
            return Err(AppError::validation("email.smtp_server is empty"));
        }
        if self.sender_email.trim().is_empty() {
            return Err(AppError::validation("email.sender_email is empty"));
        }
        if self.recipients().is_empty() {
            return Err(AppError::validation("email.recipient_emails is empty"));
        }
        Ok(())
    }
}

/// History/persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Directory holding the JSON record files
    #[serde(default = "defaults::database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            path: defaults::database_path(),
        }
    }
}

/// How the `schedule` command triggers runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    #[default]
    Interval,
    #[serde(alias = "cron")]
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub mode: ScheduleMode,

    #[serde(default = "defaults::interval_hours")]
    pub interval_hours: u64,

    #[serde(default)]
    pub interval_minutes: u64,

    /// Local time of day for `daily` mode
    #[serde(default = "defaults::daily_hour")]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,

    #[serde(default)]
    pub second: u32,
}

impl SchedulerConfig {
    fn validate(&self) -> Result<()> {
        match self.mode {
            ScheduleMode::Interval if self.interval_hours == 0 && self.interval_minutes == 0 => Err(
                AppError::validation("scheduler interval must be longer than zero"),
            ),
            ScheduleMode::Daily if self.hour > 23 || self.minute > 59 || self.second > 59 => Err(
                AppError::validation("scheduler hour/minute/second out of range"),
            ),
            _ => Ok(()),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::default(),
            interval_hours: defaults::interval_hours(),
            interval_minutes: 0,
            hour: defaults::daily_hour(),
            minute: 0,
            second: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Title segment used when the digest carries an overall summary
    #[serde(default = "defaults::roundup_label")]
    pub roundup_label: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            roundup_label: defaults::roundup_label(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn app_name() -> String {
        "NewsTracker".into()
    }
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn enabled() -> bool {
        true
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; NewsTracker/1.0)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Deduplication defaults
    pub fn url_similarity_threshold() -> f64 {
        0.95
    }
    pub fn content_similarity_threshold() -> f64 {
        0.85
    }
    pub fn load_existing_days() -> u32 {
        7
    }
    pub fn history_limit() -> usize {
        1000
    }

    // Collector defaults
    pub fn num_results() -> usize {
        5
    }
    pub fn max_articles() -> usize {
        10
    }
    pub fn search_engine_url() -> String {
        "https://html.duckduckgo.com/html/".into()
    }
    pub fn huatu_base_url() -> String {
        "https://www.huatu.com".into()
    }

    // LLM defaults
    pub fn llm_model() -> String {
        "gpt-4o-mini".into()
    }
    pub fn llm_api_base_url() -> String {
        "https://api.openai.com/v1".into()
    }
    pub fn llm_temperature() -> f32 {
        0.7
    }
    pub fn llm_max_tokens() -> u32 {
        1000
    }
    pub fn llm_max_concurrent() -> usize {
        1
    }
    pub fn llm_timeout() -> u64 {
        60
    }

    pub fn smtp_port() -> u16 {
        587
    }
    pub fn database_path() -> PathBuf {
        PathBuf::from("data")
    }

    // Scheduler defaults
    pub fn interval_hours() -> u64 {
        1
    }
    pub fn daily_hour() -> u32 {
        9
    }

    pub fn roundup_label() -> String {
        "Roundup".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            username: "user".to_string(),
            password: "secret".to_string(),
            sender_email: "digest@example.com".to_string(),
            recipient_emails: "a@example.com, b@example.com".to_string(),
        }
    }

    fn runnable_config() -> Config {
        let mut config = Config::default();
        config.email = Some(email());
        config.search.rss_feed_urls = vec!["https://example.com/feed.xml".to_string()];
        config
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert!(config.deduplication.enabled);
        assert_eq!(config.deduplication.url_similarity_threshold, 0.95);
        assert_eq!(config.deduplication.content_similarity_threshold, 0.85);
        assert_eq!(config.deduplication.load_existing_days, 7);
        assert!(!config.deduplication.within_batch);
        assert!(!config.huatu.enabled);
        assert!(config.email.is_none());
    }

    #[test]
    fn validate_runnable_config_ok() {
        assert!(runnable_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_email() {
        let mut config = runnable_config();
        config.email = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_no_collector() {
        let mut config = runnable_config();
        config.search.rss_feed_urls.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_threshold_out_of_range() {
        let mut config = runnable_config();
        config.deduplication.content_similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = runnable_config();
        config.scheduler.interval_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_topic_trims_blank() {
        let mut search = SearchConfig::default();
        search.topic = Some("   ".to_string());
        assert_eq!(search.topic(), None);
        search.topic = Some(" exams ".to_string());
        assert_eq!(search.topic(), Some("exams"));
    }

    #[test]
    fn test_feed_urls_precedence() {
        let mut search = SearchConfig::default();
        search.rss_feed_url = Some("https://single.example.com/rss".to_string());
        assert_eq!(search.feed_urls(), vec!["https://single.example.com/rss"]);

        search.rss_feed_urls = vec!["https://list.example.com/rss".to_string()];
        assert_eq!(search.feed_urls(), vec!["https://list.example.com/rss"]);
    }

    #[test]
    fn test_recipients_split() {
        assert_eq!(email().recipients(), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            app_name = "Digest"

            [deduplication]
            content_similarity_threshold = 0.9

            [huatu]
            enabled = true
            topic = "广东考公"

            [scheduler]
            mode = "daily"
            hour = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.app_name, "Digest");
        assert_eq!(config.deduplication.content_similarity_threshold, 0.9);
        assert_eq!(config.deduplication.url_similarity_threshold, 0.95);
        assert!(config.huatu.enabled);
        assert_eq!(config.scheduler.mode, ScheduleMode::Daily);
        assert_eq!(config.scheduler.hour, 7);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../../config.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.search.topic(), Some("公务员考试"));
        assert_eq!(config.email.as_ref().map(|e| e.smtp_port), Some(465));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = runnable_config();
        config.apply_overrides(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "NEWSTRACKER_SMTP_PASSWORD" => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.email.unwrap().password, "from-env");
    }
}
