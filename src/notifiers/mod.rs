// src/notifiers/mod.rs

//! Digest delivery.

pub mod email;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Digest;

pub use email::EmailNotifier;

/// Delivers a finished digest.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the digest. Errors reach the caller of the run.
    async fn send(&self, digest: &Digest) -> Result<()>;
}
