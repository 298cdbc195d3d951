// src/models/mod.rs

//! Domain models for the digest pipeline.
//!
//! Records flowing through a run (articles, processed articles, digests)
//! and the configuration that drives it.

mod article;
mod config;

// Re-export all public types
pub use article::{Article, Digest, ProcessedArticle};
pub use config::{
    Config, CrawlerConfig, DatabaseConfig, DeduplicationConfig, DigestConfig, EmailConfig,
    HuatuConfig, LlmConfig, LoggingConfig, ScheduleMode, SchedulerConfig, SearchConfig,
};
