// src/dedup/similarity.rs

//! Content hashing and fuzzy similarity scores.
//!
//! Scores are normalized Levenshtein ratios in `[0, 1]` computed over the
//! normalized forms of their inputs, so case and whitespace never matter.

use sha2::{Digest, Sha256};
use strsim::normalized_levenshtein;

use crate::utils::{normalize_content, normalize_url};

/// SHA-256 of the normalized text, lowercase hex.
pub fn content_hash(text: &str) -> String {
    hash_normalized(&normalize_content(text))
}

/// Hash of text that has already been through `normalize_content`.
pub(crate) fn hash_normalized(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Similarity of two article bodies.
///
/// Symmetric, 1.0 for texts that normalize to the same string, 0.0 when
/// either side is empty.
pub fn content_similarity(a: &str, b: &str) -> f64 {
    normalized_ratio(&normalize_content(a), &normalize_content(b))
}

/// Similarity of two URLs after canonicalization.
pub fn url_similarity(a: &str, b: &str) -> f64 {
    if a.trim().is_empty() || b.trim().is_empty() {
        return 0.0;
    }
    normalized_ratio(&normalize_url(a), &normalize_url(b))
}

/// Edit-distance ratio of two strings that are already normalized.
pub(crate) fn normalized_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    normalized_levenshtein(a, b)
}

/// Upper bound on `normalized_ratio(a, b)` from character counts alone.
///
/// The edit distance is at least the length difference, so a pair whose
/// bound is below a threshold can never reach it.
pub fn similarity_upper_bound(a: &str, b: &str) -> f64 {
    let (la, lb) = (a.chars().count(), b.chars().count());
    let longest = la.max(lb);
    if la == 0 || lb == 0 {
        return 0.0;
    }
    1.0 - la.abs_diff(lb) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ignores_case_and_whitespace() {
        assert_eq!(
            content_hash("Exam  Schedule\nAnnounced"),
            content_hash(" exam schedule announced ")
        );
        assert_ne!(content_hash("exam"), content_hash("exams"));
        assert_eq!(content_hash("x").len(), 64);
    }

    #[test]
    fn test_content_similarity_bounds() {
        assert_eq!(content_similarity("Same Text", "same   text"), 1.0);
        assert_eq!(content_similarity("", "anything"), 0.0);
        assert_eq!(content_similarity("anything", "   "), 0.0);
    }

    #[test]
    fn test_content_similarity_symmetric() {
        let a = "registration opens on march first";
        let b = "registration closes on march fifth";
        let ab = content_similarity(a, b);
        assert_eq!(ab, content_similarity(b, a));
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn test_content_similarity_ratio() {
        // one substitution in ten characters
        let score = content_similarity("abcdefghij", "abcdefghiX");
        assert!((score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_url_similarity() {
        let u = "https://example.com/news/1";
        assert_eq!(url_similarity(u, u), 1.0);
        assert_eq!(
            url_similarity(u, "https://EXAMPLE.com/news/1/?utm_source=feed"),
            1.0
        );
        assert_eq!(url_similarity("", u), 0.0);
        assert!(url_similarity(u, "https://example.com/news/2") < 1.0);
    }

    #[test]
    fn test_upper_bound_never_below_ratio() {
        let pairs = [
            ("abcdefghij", "abc"),
            ("short", "a much longer sentence"),
            ("same length", "diff length"),
            ("广东省考", "广东省考公告"),
        ];
        for (a, b) in pairs {
            assert!(similarity_upper_bound(a, b) >= normalized_ratio(a, b));
        }
        assert_eq!(similarity_upper_bound("", "abc"), 0.0);
    }
}
