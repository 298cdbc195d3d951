// src/collectors/page.rs

//! Article extraction from fetched HTML pages.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::Article;
use crate::utils::truncate_with_ellipsis;

/// Maximum stored body length in characters, ellipsis included.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Body candidates tried in order for generic pages.
pub const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    ".content",
    ".article-content",
    ".post-content",
    ".entry-content",
    "#content",
    ".main-content",
    "div[role=\"main\"]",
    "body",
];

/// A body shorter than this is not worth summarizing.
pub const MIN_CONTENT_CHARS: usize = 100;

/// A body longer than this ends the selector search early.
const SUBSTANTIAL_CHARS: usize = 200;

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Whitespace-collapsed text of an element, skipping script and style content.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));
        if !hidden {
            parts.push(text);
        }
    }
    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the document `<title>`, if present and non-empty.
pub fn extract_title(document: &Html) -> Option<String> {
    let selector = parse_selector("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(visible_text)
        .filter(|t| !t.is_empty())
}

/// Text of the first element matching the first selector that yields any text.
pub fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|s| {
        let selector = parse_selector(s).ok()?;
        document
            .select(&selector)
            .next()
            .map(visible_text)
            .filter(|t| !t.is_empty())
    })
}

/// Main body text using the generic selector list.
///
/// The first candidate longer than 200 characters wins; otherwise the longest
/// candidate is used when it reaches the minimum length.
pub fn extract_body(document: &Html, selectors: &[&str]) -> Option<String> {
    let mut longest = String::new();
    for s in selectors {
        let selector = match parse_selector(s) {
            Ok(selector) => selector,
            Err(e) => {
                log::warn!("{}", e);
                continue;
            }
        };
        let Some(text) = document.select(&selector).next().map(visible_text) else {
            continue;
        };
        if text.chars().count() > SUBSTANTIAL_CHARS {
            return Some(text);
        }
        if text.chars().count() > longest.chars().count() {
            longest = text;
        }
    }
    (longest.chars().count() >= MIN_CONTENT_CHARS).then_some(longest)
}

/// Build an article from a generic web page; the page URL is the source label.
pub fn extract_article(html: &str, url: &str) -> Option<Article> {
    let document = Html::parse_document(html);
    let body = extract_body(&document, CONTENT_SELECTORS)?;
    let title = extract_title(&document).unwrap_or_else(|| url.to_string());

    Some(Article::new(
        title,
        url,
        truncate_with_ellipsis(&body, MAX_CONTENT_CHARS),
        url,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(word: &str, repeat: usize) -> String {
        vec![word; repeat].join(" ")
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let document = Html::parse_document(
            "<html><body><p>Hello</p><script>var x = 1;</script><style>p{}</style><p>world</p></body></html>",
        );
        let body = parse_selector("body").unwrap();
        let text = visible_text(document.select(&body).next().unwrap());
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_extract_article_prefers_article_element() {
        let article_text = long_text("exam", 80);
        let html = format!(
            "<html><head><title> Exam Notice </title></head><body><nav>menu</nav><article>{article_text}</article></body></html>"
        );

        let article = extract_article(&html, "https://example.com/a").unwrap();
        assert_eq!(article.title, "Exam Notice");
        assert_eq!(article.content, article_text);
        assert_eq!(article.source, "https://example.com/a");
    }

    #[test]
    fn test_extract_article_rejects_thin_pages() {
        let html = "<html><head><title>Empty</title></head><body><p>Too short.</p></body></html>";
        assert!(extract_article(html, "https://example.com/b").is_none());
    }

    #[test]
    fn test_extract_article_truncates_long_body() {
        let html = format!(
            "<html><body><main>{}</main></body></html>",
            "x".repeat(MAX_CONTENT_CHARS + 50)
        );
        let article = extract_article(&html, "https://example.com/c").unwrap();
        assert!(article.content.ends_with("..."));
        assert_eq!(article.content.chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(article.title, "https://example.com/c");
    }

    #[test]
    fn test_first_text() {
        let document =
            Html::parse_document("<html><body><div class=\"content\">Body</div></body></html>");
        assert_eq!(
            first_text(&document, &["div.article-content", "div.content"]),
            Some("Body".to_string())
        );
    }
}
