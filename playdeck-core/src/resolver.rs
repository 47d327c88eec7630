//! Playback source resolution.
//!
//! Turns the raw source strings found in catalog playlists (and typed by
//! users) into normalized playable URLs. Sources are often sloppy: padded
//! with whitespace, prefixed with labels, missing a scheme. Resolution keeps
//! the longest URL-shaped suffix and upgrades plain `http:` to `https:`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Scheme, slashes, host, port, path, query and fragment, anchored at the end.
static URL_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z0-9]+:)?/*?([^#?/:]+)(:\d+)?([^:#?]*?)(\?[^#]*)?(#.*)?$")
        .expect("URL grammar is a valid regular expression")
});

const INSECURE_SCHEME: &str = "http:";
/// Path suffix of HLS-style adaptive manifests.
pub const ADAPTIVE_MANIFEST_SUFFIX: &str = ".m3u8";
const SECURE_SCHEME: &str = "https:";

/// Errors produced while resolving a playback source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Input holds no URL-shaped text
    #[error("not a URL: '{input}'")]
    NotAUrl {
        /// Trimmed input that was rejected
        input: String,
    },
}

/// How resolution treats the matched URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvePolicy {
    /// Rewrite `http:` to `https:`
    pub upgrade_insecure: bool,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            upgrade_insecure: true,
        }
    }
}

/// A normalized playable URL and its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    url: String,
    scheme: Option<String>,
    host: String,
    port: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl ResolvedUrl {
    /// The full normalized URL.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Scheme including the trailing colon, e.g. `https:`.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port digits without the colon.
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Path, possibly empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query including the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Fragment including the leading `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Returns true when the path ends with `suffix`, ignoring ASCII case.
    pub fn has_path_suffix(&self, suffix: &str) -> bool {
        let path = self.path.as_bytes();
        let suffix = suffix.as_bytes();
        path.len() >= suffix.len() && path[path.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    }

    /// Returns true when the path names an adaptive manifest.
    pub fn is_adaptive_manifest(&self) -> bool {
        self.has_path_suffix(ADAPTIVE_MANIFEST_SUFFIX)
    }

    /// Consumes the resolved URL, returning the full string.
    pub fn into_string(self) -> String {
        self.url
    }
}

impl std::fmt::Display for ResolvedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Resolves a raw source with the default policy.
///
/// # Errors
///
/// - `ResolveError::NotAUrl` - If no URL-shaped suffix exists in the input
pub fn resolve(raw: &str) -> Result<ResolvedUrl, ResolveError> {
    resolve_with(raw, ResolvePolicy::default())
}

/// Resolves a raw source with an explicit policy.
///
/// # Errors
///
/// - `ResolveError::NotAUrl` - If no URL-shaped suffix exists in the input
pub fn resolve_with(raw: &str, policy: ResolvePolicy) -> Result<ResolvedUrl, ResolveError> {
    let input = raw.trim();
    let captures = URL_GRAMMAR
        .captures(input)
        .ok_or_else(|| ResolveError::NotAUrl {
            input: input.to_string(),
        })?;

    let matched = captures.get(0).map_or("", |m| m.as_str());
    let group = |captures: &Captures<'_>, index: usize| {
        captures.get(index).map(|m| m.as_str().to_string())
    };

    let mut scheme = group(&captures, 1);
    let mut url = matched.to_string();
    if policy.upgrade_insecure && scheme.as_deref() == Some(INSECURE_SCHEME) {
        url = format!("{SECURE_SCHEME}{}", &matched[INSECURE_SCHEME.len()..]);
        scheme = Some(SECURE_SCHEME.to_string());
    }

    Ok(ResolvedUrl {
        url,
        scheme,
        host: group(&captures, 2).unwrap_or_default(),
        port: group(&captures, 3).map(|port| port.trim_start_matches(':').to_string()),
        path: group(&captures, 4).unwrap_or_default(),
        query: group(&captures, 5),
        fragment: group(&captures, 6),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_http_is_upgraded() {
        let resolved = resolve("http://example.com/v.mp4").unwrap();

        assert_eq!(resolved.as_str(), "https://example.com/v.mp4");
        assert_eq!(resolved.scheme(), Some("https:"));
        assert_eq!(resolved.host(), "example.com");
        assert_eq!(resolved.path(), "/v.mp4");
    }

    #[test]
    fn test_all_parts_are_captured() {
        let resolved = resolve("  http://cdn.test:8080/a/b.m3u8?token=1#t=30  ").unwrap();

        assert_eq!(resolved.as_str(), "https://cdn.test:8080/a/b.m3u8?token=1#t=30");
        assert_eq!(resolved.port(), Some("8080"));
        assert_eq!(resolved.path(), "/a/b.m3u8");
        assert_eq!(resolved.query(), Some("?token=1"));
        assert_eq!(resolved.fragment(), Some("#t=30"));
    }

    #[test]
    fn test_other_schemes_unchanged() {
        for raw in [
            "https://example.com/v.mp4",
            "rtmp://live.test/stream",
            "HTTP://example.com/v.mp4",
        ] {
            assert_eq!(resolve(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_malformed_prefix_is_dropped() {
        let resolved = resolve("watch: https://a.test/x.m3u8").unwrap();
        assert_eq!(resolved.as_str(), "https://a.test/x.m3u8");
    }

    #[test]
    fn test_schemeless_source() {
        let resolved = resolve("media.test/full.mp4").unwrap();

        assert_eq!(resolved.as_str(), "media.test/full.mp4");
        assert_eq!(resolved.scheme(), None);
        assert_eq!(resolved.host(), "media.test");
    }

    #[test]
    fn test_non_urls_fail() {
        for raw in ["", "   ", "://", "http://", "???"] {
            assert!(
                matches!(resolve(raw), Err(ResolveError::NotAUrl { .. })),
                "expected failure for {raw:?}"
            );
        }
    }

    #[test]
    fn test_upgrade_can_be_disabled() {
        let policy = ResolvePolicy {
            upgrade_insecure: false,
        };
        let resolved = resolve_with("http://example.com/v.mp4", policy).unwrap();
        assert_eq!(resolved.as_str(), "http://example.com/v.mp4");
    }

    #[test]
    fn test_path_suffix_ignores_case() {
        let resolved = resolve("https://a.test/live/INDEX.M3U8?x=1").unwrap();

        assert!(resolved.has_path_suffix(".m3u8"));
        assert!(resolved.is_adaptive_manifest());
        assert!(!resolve("https://a.test/v.mp4").unwrap().has_path_suffix(".m3u8"));
        assert!(!resolve("https://a.test/?f=x.m3u8").unwrap().has_path_suffix(".m3u8"));
    }

    proptest! {
        #[test]
        fn prop_http_upgraded_everything_else_kept(
            host in "[a-z][a-z0-9]{0,10}(\\.[a-z]{2,5}){1,2}",
            path in "(/[a-zA-Z0-9_.-]{1,8}){0,4}",
            query in "(\\?[a-z]{1,5}=[a-z0-9]{1,5})?",
        ) {
            let rest = format!("//{host}{path}{query}");

            let upgraded = resolve(&format!("http:{rest}")).unwrap();
            prop_assert_eq!(upgraded.as_str(), format!("https:{rest}"));

            for scheme in ["https:", "ftp:", "rtsp:"] {
                let raw = format!("{scheme}{rest}");
                let resolved = resolve(&raw).unwrap();
                prop_assert_eq!(resolved.as_str(), raw.as_str());
            }
        }

        #[test]
        fn prop_resolution_is_deterministic(raw in ".{0,40}") {
            prop_assert_eq!(resolve(&raw), resolve(&raw));
        }
    }
}
