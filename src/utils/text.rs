// src/utils/text.rs

//! Text normalization and truncation helpers.

use regex::Regex;
use scraper::Html;
use unicode_segmentation::UnicodeSegmentation;

/// Collapse whitespace runs to a single space, trim, and lower-case.
pub fn normalize_content(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keep at most `max` grapheme clusters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.graphemes(true).take(max).collect()
}

const ELLIPSIS: &str = "...";

/// Cap `text` at `max` grapheme clusters. When anything is cut, the result
/// ends in `...` and the ellipsis counts toward `max`.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.graphemes(true).nth(max).is_none() {
        return text.to_string();
    }
    let head = truncate_chars(text, max.saturating_sub(ELLIPSIS.len()));
    format!("{head}{ELLIPSIS}")
}

/// Drop markup from an HTML fragment, leaving whitespace-collapsed text.
pub fn strip_html(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let text: Vec<&str> = parsed.root_element().text().collect();
    text.join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove a surrounding Markdown code fence from a model reply.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Ok(fence) = Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$") else {
        return trimmed;
    };
    fence
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|inner| inner.as_str())
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_content() {
        assert_eq!(
            normalize_content("  Hello\n\tWORLD   again "),
            "hello world again"
        );
        assert_eq!(normalize_content(" \n "), "");
    }

    #[test]
    fn test_truncate_chars_counts_graphemes() {
        assert_eq!(truncate_chars("广东省考公告", 4), "广东省考");
        assert_eq!(truncate_chars("short", 50), "short");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("abcdefgh", 6), "abc...");
        assert_eq!(truncate_with_ellipsis("abcdef", 6), "abcdef");
        assert_eq!(truncate_with_ellipsis("abc", 3), "abc");
        assert_eq!(truncate_with_ellipsis("考试报名时间通知", 5), "考试...");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Exam <b>dates</b>&amp; rules</p>\n<br/>"),
            "Exam dates & rules"
        );
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence(" {\"a\": 1} "), "{\"a\": 1}");
    }
}
