//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod text;
pub mod url;

pub use text::{normalize_content, truncate_chars, truncate_with_ellipsis};
pub use self::url::normalize_url;
