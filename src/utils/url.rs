// src/utils/url.rs

//! URL canonicalization for duplicate detection.

use url::Url;

/// Query parameters that only carry tracking/attribution data.
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "source",
    "from",
    "_t",
    "share",
];

fn is_tracking_param(name: &str) -> bool {
    let name = name.to_lowercase();
    TRACKING_PARAMS.contains(&name.as_str())
}

/// Canonicalize a URL for duplicate comparison.
///
/// Scheme and host come out lower-cased, the fragment and tracking
/// parameters are dropped, remaining parameters keep their order and are
/// re-encoded, and trailing slashes are removed from the path. Strings that
/// do not parse fall back to their trimmed lower-case form.
///
/// # Examples
/// ```
/// use newstracker::utils::url::normalize_url;
///
/// assert_eq!(
///     normalize_url("HTTPS://Example.com/news/?utm_source=x&id=7#top"),
///     "https://example.com/news?id=7"
/// );
/// ```
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_lowercase();
    };

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(name, _)| !is_tracking_param(name))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    if !parsed.cannot_be_a_base() {
        let path = parsed.path().trim_end_matches('/').to_string();
        parsed.set_path(if path.is_empty() { "/" } else { &path });
    }

    parsed.to_string()
}
