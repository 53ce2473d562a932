//! Matcher engine — compiles a sparse [`SpyMatch`] into a predicate
//!
//! Each present key of the configuration becomes an independent
//! sub-predicate; the compiled matcher is their AND-composition. Zero
//! sub-predicates is vacuously true, so an empty configuration matches
//! every request.

use crate::{RequestSnapshot, SpyError};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Declarative filter criteria for a spy.
///
/// Every key is optional; absence means "no constraint on that dimension".
/// Designed for struct-literal construction with `..Default::default()`,
/// and deserializable so test fixtures can declare it.
///
/// # Example
///
/// ```
/// use fetchspy::SpyMatch;
///
/// let config = SpyMatch {
///     method: Some("get".into()),
///     pathname: Some("/api/users".into()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpyMatch {
    /// HTTP method, matched case-insensitively.
    pub method: Option<String>,
    /// Exact origin (scheme + host + port) of the request URL.
    pub origin: Option<String>,
    /// Pathname pattern with trailing-wildcard glob semantics.
    pub pathname: Option<String>,
    /// Query parameters that must all be present with these exact values.
    pub queryparams: Option<BTreeMap<String, String>>,
}

/// One compiled filter dimension.
#[derive(Debug, Clone)]
enum SubPredicate {
    Method(String),
    Origin(String),
    Pathname(PathGlob),
    QueryParam { name: String, expected: String },
}

impl SubPredicate {
    fn evaluate(&self, snapshot: &RequestSnapshot) -> bool {
        match self {
            Self::Method(method) => snapshot.method().eq_ignore_ascii_case(method),
            Self::Origin(origin) => snapshot.url().origin().ascii_serialization() == *origin,
            Self::Pathname(glob) => glob.matches(snapshot.url().path()),
            Self::QueryParam { name, expected } => snapshot
                .url()
                .query_pairs()
                .find(|(key, _)| key.as_ref() == name)
                .map_or(false, |(_, value)| value.as_ref() == expected),
        }
    }
}

/// A compiled request matcher: AND-composition of sub-predicates.
///
/// # INV: vacuous truth
///
/// A matcher compiled from an empty configuration has zero sub-predicates
/// and matches every request.
#[derive(Debug, Clone)]
pub struct RequestMatcher {
    predicates: Vec<SubPredicate>,
}

impl RequestMatcher {
    /// Compile a configuration into a matcher.
    ///
    /// The `origin` filter is normalized through URL parsing at compile
    /// time (so `https://localhost:443` and `https://localhost` compare
    /// equal) and the `pathname` glob is compiled to a regex once, here.
    ///
    /// # Errors
    ///
    /// - [`SpyError::InvalidOrigin`] when the origin filter does not parse.
    /// - [`SpyError::InvalidPattern`] when the pathname glob fails to
    ///   compile (escaped input, so practically unreachable).
    pub fn compile(config: &SpyMatch) -> Result<Self, SpyError> {
        let mut predicates = Vec::new();

        if let Some(method) = &config.method {
            predicates.push(SubPredicate::Method(method.clone()));
        }
        if let Some(origin) = &config.origin {
            let parsed = url::Url::parse(origin).map_err(|source| SpyError::InvalidOrigin {
                origin: origin.clone(),
                source,
            })?;
            predicates.push(SubPredicate::Origin(parsed.origin().ascii_serialization()));
        }
        if let Some(pathname) = &config.pathname {
            predicates.push(SubPredicate::Pathname(PathGlob::compile(pathname)?));
        }
        if let Some(queryparams) = &config.queryparams {
            for (name, expected) in queryparams {
                predicates.push(SubPredicate::QueryParam {
                    name: name.clone(),
                    expected: expected.clone(),
                });
            }
        }

        Ok(Self { predicates })
    }

    /// Evaluate this matcher against a snapshot.
    ///
    /// True iff every sub-predicate holds; trivially true with zero
    /// sub-predicates.
    #[must_use]
    pub fn matches(&self, snapshot: &RequestSnapshot) -> bool {
        self.predicates.iter().all(|p| p.evaluate(snapshot))
    }

    /// Number of compiled sub-predicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// True when no filter dimension is configured (matches everything).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Trailing-wildcard pathname glob.
///
/// The pattern's trailing run of `*` and `/` is stripped and the remaining
/// stem matches segment-aware: `/foo` matches `/foo`, `/foo/`, and
/// `/foo/bar`, but not `/foobar`. A `*` anywhere other than the trailing
/// run is an ordinary character — this is a prefix glob, not a general glob
/// engine. An empty stem (pattern `/`, `*`, ...) matches every path.
#[derive(Debug, Clone)]
pub struct PathGlob {
    pattern: String,
    regex: Regex,
}

impl PathGlob {
    /// Compile a pathname pattern.
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::InvalidPattern`] if regex compilation fails.
    pub fn compile(pattern: &str) -> Result<Self, SpyError> {
        let stem = pattern.trim_end_matches(['*', '/']);
        let source = format!("^{}(/.*)?$", regex::escape(stem));
        let regex = Regex::new(&source).map_err(|e| SpyError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as originally written.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Test a URL pathname against this glob.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CallArgs;

    fn snapshot(url: &str) -> RequestSnapshot {
        RequestSnapshot::capture(&CallArgs::get(url)).unwrap()
    }

    fn snapshot_with_method(url: &str, method: &str) -> RequestSnapshot {
        let args = CallArgs::with_options(
            url,
            crate::FetchOptions {
                method: Some(method.into()),
                ..Default::default()
            },
        );
        RequestSnapshot::capture(&args).unwrap()
    }

    // ========== Empty configuration ==========

    #[test]
    fn empty_config_matches_everything() {
        let matcher = RequestMatcher::compile(&SpyMatch::default()).unwrap();
        assert!(matcher.is_empty());
        assert!(matcher.matches(&snapshot("https://localhost/")));
        assert!(matcher.matches(&snapshot("http://example.com/a/b?c=d")));
    }

    // ========== Method ==========

    #[test]
    fn method_matches_case_insensitively() {
        let matcher = RequestMatcher::compile(&SpyMatch {
            method: Some("get".into()),
            ..Default::default()
        })
        .unwrap();

        assert!(matcher.matches(&snapshot_with_method("https://localhost/", "GET")));
        assert!(!matcher.matches(&snapshot_with_method("https://localhost/", "POST")));
    }

    // ========== Origin ==========

    #[test]
    fn origin_matches_scheme_host_port() {
        let matcher = RequestMatcher::compile(&SpyMatch {
            origin: Some("https://localhost".into()),
            ..Default::default()
        })
        .unwrap();

        assert!(matcher.matches(&snapshot("https://localhost/foo")));
        assert!(!matcher.matches(&snapshot("http://localhost/foo")));
        assert!(!matcher.matches(&snapshot("https://localhost:8080/foo")));
        assert!(!matcher.matches(&snapshot("https://example.com/foo")));
    }

    #[test]
    fn origin_default_port_compares_equal() {
        let matcher = RequestMatcher::compile(&SpyMatch {
            origin: Some("https://localhost:443".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(matcher.matches(&snapshot("https://localhost/foo")));
    }

    #[test]
    fn unparseable_origin_is_rejected_at_compile() {
        let result = RequestMatcher::compile(&SpyMatch {
            origin: Some("localhost".into()),
            ..Default::default()
        });
        assert!(matches!(result, Err(SpyError::InvalidOrigin { .. })));
    }

    // ========== Pathname ==========

    #[test]
    fn pathname_matches_prefix_segments() {
        let matcher = RequestMatcher::compile(&SpyMatch {
            pathname: Some("/foo".into()),
            ..Default::default()
        })
        .unwrap();

        assert!(matcher.matches(&snapshot("https://localhost/foo")));
        assert!(matcher.matches(&snapshot("https://localhost/foo/")));
        assert!(matcher.matches(&snapshot("https://localhost/foo/bar")));
        // Segment-aware: the wildcard only continues after a separator.
        assert!(!matcher.matches(&snapshot("https://localhost/foobar")));
    }

    #[test]
    fn pathname_trailing_slash_and_stars_normalize_to_same_glob() {
        for pattern in ["/foo", "/foo/", "/foo*", "/foo/*", "/foo***"] {
            let glob = PathGlob::compile(pattern).unwrap();
            assert_eq!(glob.pattern(), pattern);
            assert!(glob.matches("/foo"), "{pattern} should match /foo");
            assert!(glob.matches("/foo/bar"), "{pattern} should match /foo/bar");
            assert!(!glob.matches("/foobar"), "{pattern} should not match /foobar");
        }
    }

    #[test]
    fn pathname_root_matches_every_path() {
        let glob = PathGlob::compile("/").unwrap();
        assert!(glob.matches("/"));
        assert!(glob.matches("/anything/at/all"));
    }

    #[test]
    fn pathname_inner_star_is_literal() {
        let glob = PathGlob::compile("/a*b").unwrap();
        assert!(glob.matches("/a*b"));
        assert!(glob.matches("/a*b/c"));
        assert!(!glob.matches("/axb"));
    }

    // ========== Query parameters ==========

    #[test]
    fn queryparams_require_every_key_exact() {
        let matcher = RequestMatcher::compile(&SpyMatch {
            queryparams: Some(BTreeMap::from([("a".to_string(), "1".to_string())])),
            ..Default::default()
        })
        .unwrap();

        assert!(matcher.matches(&snapshot("https://localhost/?a=1&b=2")));
        assert!(!matcher.matches(&snapshot("https://localhost/?a=2")));
        assert!(!matcher.matches(&snapshot("https://localhost/?b=2")));
    }

    #[test]
    fn queryparams_use_first_value() {
        let matcher = RequestMatcher::compile(&SpyMatch {
            queryparams: Some(BTreeMap::from([("a".to_string(), "1".to_string())])),
            ..Default::default()
        })
        .unwrap();

        assert!(matcher.matches(&snapshot("https://localhost/?a=1&a=2")));
        assert!(!matcher.matches(&snapshot("https://localhost/?a=2&a=1")));
    }

    #[test]
    fn queryparams_multiple_keys_are_anded() {
        let matcher = RequestMatcher::compile(&SpyMatch {
            queryparams: Some(BTreeMap::from([
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ])),
            ..Default::default()
        })
        .unwrap();

        assert!(matcher.matches(&snapshot("https://localhost/?a=1&b=2")));
        assert!(!matcher.matches(&snapshot("https://localhost/?a=1")));
    }

    // ========== Composition ==========

    #[test]
    fn all_dimensions_are_anded() {
        let matcher = RequestMatcher::compile(&SpyMatch {
            method: Some("GET".into()),
            origin: Some("https://localhost".into()),
            pathname: Some("/api".into()),
            queryparams: Some(BTreeMap::from([("v".to_string(), "1".to_string())])),
        })
        .unwrap();
        assert_eq!(matcher.len(), 4);

        assert!(matcher.matches(&snapshot("https://localhost/api/users?v=1")));
        assert!(!matcher.matches(&snapshot("https://localhost/api/users?v=2")));
        assert!(!matcher.matches(&snapshot("https://localhost/other?v=1")));
        assert!(!matcher.matches(&snapshot_with_method(
            "https://localhost/api?v=1",
            "POST"
        )));
    }

    #[test]
    fn config_deserializes_from_sparse_yaml_shape() {
        let config: SpyMatch =
            serde_json::from_str(r#"{"pathname": "/foo", "queryparams": {"a": "1"}}"#).unwrap();
        assert_eq!(config.pathname.as_deref(), Some("/foo"));
        assert!(config.method.is_none());
        let matcher = RequestMatcher::compile(&config).unwrap();
        assert!(matcher.matches(&snapshot("https://localhost/foo?a=1")));
    }
}
