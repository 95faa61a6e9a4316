//! URL canonicalization for identity comparison.
//!
//! Two links that point at the same story should normalize to the same
//! string, so this is what the seen-URL store and the in-batch duplicate
//! check key on. Normalization is pure and idempotent, and anything that is
//! not an `http`/`https` URL normalizes to the empty string.

use std::collections::BTreeMap;
use url::Url;

/// Query parameters that only carry tracking information.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_name",
    "utm_reader",
    "utm_brand",
    "utm_cid",
    "ref",
    "ref_src",
    "ref_url",
    "fbclid",
    "gclid",
    "gclsrc",
    "dclid",
    "mc_cid",
    "mc_eid",
    "_hsenc",
    "_hsmi",
    "mkt_tok",
    "igshid",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Normalize a URL, or return `""` if it must be rejected.
///
/// - only `http` and `https` are accepted, and the result is always `https`
/// - the fragment is dropped
/// - tracking parameters (`utm_*` and a fixed deny-list) are removed
/// - remaining parameters are sorted by key, first value wins per key
/// - trailing slashes are stripped from the path unless it is just `/`
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_url("http://Example.com/a/?utm_source=x#top"), "https://example.com/a");
/// assert_eq!(normalize_url("javascript:alert(1)"), "");
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return String::new();
    };
    if !matches!(url.scheme(), "http" | "https") {
        return String::new();
    }
    if url.set_scheme("https").is_err() {
        return String::new();
    }
    url.set_fragment(None);

    let mut kept: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        if is_tracking_param(&key) {
            continue;
        }
        kept.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }

    let path = url.path().to_string();
    if path != "/" {
        let trimmed = path.trim_end_matches('/');
        url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    url.to_string()
}
