//! Utility functions and helpers.

pub mod http;

use regex::Regex;
use url::Url;

/// Compile a built-in pattern. Only for compile-time constant patterns.
pub(crate) fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Canonical form of a listing URL.
///
/// The site appends a stray `'n` to some hrefs; it is removed together with
/// surrounding whitespace and any fragment before resolving against `base`.
pub fn canonical_url(base: &Url, href: &str) -> String {
    let mut href = href.trim();
    if let Some((head, _)) = href.split_once('#') {
        href = head;
    }
    let href = href.trim_end().trim_end_matches("'n").trim_end();
    resolve_url(base, href)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://www.blocket.se/bostad/uthyres/").unwrap();
        assert_eq!(
            resolve_url(&base, "stockholm"),
            "https://www.blocket.se/bostad/uthyres/stockholm"
        );
        assert_eq!(
            resolve_url(&base, "/stockholm/rum_123.htm"),
            "https://www.blocket.se/stockholm/rum_123.htm"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_canonical_url_strips_artifacts() {
        let base = Url::parse("https://www.blocket.se/bostad/uthyres/stockholm?o=1").unwrap();
        assert_eq!(
            canonical_url(&base, "https://www.blocket.se/stockholm/rum_123.htm?ca=11'n"),
            "https://www.blocket.se/stockholm/rum_123.htm?ca=11"
        );
        assert_eq!(
            canonical_url(&base, " /stockholm/rum_123.htm#bilder "),
            "https://www.blocket.se/stockholm/rum_123.htm"
        );
    }
}
