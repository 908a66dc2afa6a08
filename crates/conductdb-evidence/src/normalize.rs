//! URL canonicalization, registrable-domain extraction, and title
//! fingerprinting for source clustering.
//!
//! Nothing in this module returns an error: unparsable input degrades to the
//! original string (for canonicalization) or `None` (for domains).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use conductdb_core::LinkKind;
use regex::Regex;
use url::{Host, Url};

/// Number of leading tokens that feed the title fingerprint.
pub const FINGERPRINT_TOKENS: usize = 30;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Query parameters that only carry campaign or click attribution.
/// Anything starting with `utm_` is also stripped.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "igshid", "ref", "ref_src",
    "cmpid", "ocid", "_ga", "yclid", "spm",
];

/// Path segments that mark a registry or database record rather than an article.
const DATABASE_SEGMENTS: &[&str] = &[
    "search",
    "database",
    "records",
    "record",
    "case",
    "cases",
    "docket",
    "filings",
    "enforcement",
    "establishment",
    "violations",
];

static AMP_LEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/amp(/|$)").expect("valid leading amp regex"));
static AMP_TRAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/amp/?$").expect("valid trailing amp regex"));
static AMP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.amp(\.html?)?$").expect("valid amp suffix regex"));

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

fn is_amp_flag(key: &str, value: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key == "amp" || (matches!(key.as_str(), "output" | "outputtype") && value == "amp")
}

fn collapse_amp_path(path: &str) -> String {
    let path = AMP_LEADING.replace(path, "/");
    let path = AMP_TRAILING.replace(&path, "");
    let path = AMP_SUFFIX.replace(&path, "$1");
    if path.is_empty() {
        "/".to_string()
    } else {
        path.into_owned()
    }
}

/// Canonicalize a source URL for comparison.
///
/// Strips tracking parameters, sorts the remaining parameters by key, removes
/// AMP markers from host, path, and query, drops the fragment and any
/// non-root trailing slash. Returns `raw` unchanged when it is not an
/// absolute `http`/`https` URL.
#[must_use]
pub fn canonicalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return raw.to_string();
    }

    url.set_fragment(None);

    let amp_host = url
        .host_str()
        .and_then(|h| h.strip_prefix("amp."))
        .filter(|h| h.contains('.'))
        .map(ToOwned::to_owned);
    if let Some(stripped) = amp_host {
        // set_host only fails for hosts that would not parse; keep the original then.
        let _ = url.set_host(Some(&stripped));
    }

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, v)| !is_tracking_param(k) && !is_amp_flag(k, v))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0));

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&params);
    }

    let mut path = collapse_amp_path(url.path());
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    url.set_path(&path);

    url.to_string()
}

/// Public-suffix-aware registrable domain of `raw`
/// (`https://news.example.co.uk/x` → `example.co.uk`).
///
/// Returns `None` for unparsable URLs, IP-address hosts, and hosts that are
/// themselves a public suffix.
#[must_use]
pub fn registrable_domain(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = match url.host()? {
        Host::Domain(d) => d.trim_end_matches('.').to_ascii_lowercase(),
        Host::Ipv4(_) | Host::Ipv6(_) => return None,
    };
    psl::domain_str(&host).map(ToOwned::to_owned)
}

/// Lowercased host of `raw`, if it parses.
#[must_use]
pub fn host_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    url.host_str()
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
}

/// 64-bit FNV-1a over `bytes`.
#[must_use]
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Lowercase `text`, turn every non-alphanumeric into a word break, and
/// join the resulting tokens with single spaces (`"Wage-Theft!"` → `"wage theft"`).
#[must_use]
pub fn normalize_tokens(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clustering key over the first [`FINGERPRINT_TOKENS`] tokens of
/// `title + snippet`, lowercased with punctuation removed.
///
/// Not an integrity hash: collisions only cause two stories to be compared.
#[must_use]
pub fn text_fingerprint(title: &str, snippet: Option<&str>) -> u64 {
    let combined = match snippet {
        Some(s) if !s.trim().is_empty() => format!("{title} {s}"),
        _ => title.to_string(),
    };
    let window = normalize_tokens(&combined)
        .split(' ')
        .take(FINGERPRINT_TOKENS)
        .collect::<Vec<_>>()
        .join(" ");
    fnv1a_64(window.as_bytes())
}

/// UTC calendar day an instant falls on.
#[must_use]
pub fn day_bucket(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Display name derived from a URL: the registrable domain's leading label
/// (`https://www.nytimes.com/...` → `nytimes`), else the host, else `unknown`.
#[must_use]
pub fn source_name_from_url(raw: &str) -> String {
    if let Some(domain) = registrable_domain(raw) {
        if let Some(label) = domain.split('.').next().filter(|l| !l.is_empty()) {
            return label.to_string();
        }
    }
    host_of(raw).unwrap_or_else(|| "unknown".to_string())
}

/// Classify what kind of page a canonical URL points at.
#[must_use]
pub fn classify_link(canonical_url: &str) -> LinkKind {
    let Ok(url) = Url::parse(canonical_url) else {
        return LinkKind::Article;
    };

    let host = url.host_str().unwrap_or_default();
    if host.starts_with("data.") || host.starts_with("db.") {
        return LinkKind::Database;
    }

    let is_database_path = url
        .path_segments()
        .into_iter()
        .flatten()
        .any(|seg| DATABASE_SEGMENTS.contains(&seg.to_ascii_lowercase().as_str()));
    if is_database_path {
        return LinkKind::Database;
    }

    if url.path() == "/" && url.query().is_none() {
        return LinkKind::Homepage;
    }

    LinkKind::Article
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
