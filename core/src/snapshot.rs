//! `RequestSnapshot` — immutable normalized record of one outgoing call
//!
//! The normalizer resolves the two call shapes ([`CallArgs`]) into exactly
//! one snapshot per intercepted call. The snapshot is captured before any
//! spy is consulted, shared by reference with every matcher and call log,
//! and never mutated afterwards.

use crate::{CallArgs, SpyError, TransportOptions};
use http::HeaderMap;
use url::Url;

/// Immutable record of one outgoing request's identifying and transport data.
///
/// The URL is parsed exactly once, here — matchers read origin, path, and
/// query parameters straight off the parsed value and have no failure path
/// of their own. Fields are private; the snapshot exposes read access only.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    url: Url,
    method: String,
    body: Option<String>,
    transport: TransportOptions,
}

impl RequestSnapshot {
    /// Normalize call arguments into a snapshot.
    ///
    /// - A request-like value contributes its method (uppercased), an eager
    ///   clone of its body text, and every transport attribute it carries.
    ///   `window` is forced to unspecified: it is not introspectable on a
    ///   request-like value.
    /// - A target plus options defaults the method to GET when unspecified;
    ///   other attributes come from the options bag, unspecified when absent.
    /// - A bare target produces a GET snapshot with every transport
    ///   attribute unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::InvalidTarget`] when the target is not an
    /// absolute URL — the same point at which the real transport would have
    /// refused to construct the request.
    pub fn capture(args: &CallArgs) -> Result<Self, SpyError> {
        match args {
            CallArgs::Request(request) => {
                let url = parse_target(&request.url)?;
                let mut transport = request.transport.clone();
                transport.window = None;
                Ok(Self {
                    url,
                    method: request.method.to_ascii_uppercase(),
                    body: request.body.clone(),
                    transport,
                })
            }
            CallArgs::Target { target, options } => {
                let url = parse_target(target)?;
                let (method, body, transport) = match options {
                    Some(options) => (
                        options
                            .method
                            .as_deref()
                            .unwrap_or("GET")
                            .to_ascii_uppercase(),
                        options.body.clone(),
                        options.transport.clone(),
                    ),
                    None => ("GET".to_string(), None, TransportOptions::default()),
                };
                Ok(Self {
                    url,
                    method,
                    body,
                    transport,
                })
            }
        }
    }

    /// The absolute request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The request URL as a string.
    #[must_use]
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// The HTTP method, uppercase.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request body text, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.transport.headers
    }

    /// The full transport attribute block (mode, cache, credentials,
    /// redirect, referrer, referrer policy, integrity, keepalive, signal,
    /// window).
    #[must_use]
    pub fn transport(&self) -> &TransportOptions {
        &self.transport
    }
}

fn parse_target(target: &str) -> Result<Url, SpyError> {
    Url::parse(target).map_err(|source| SpyError::InvalidTarget {
        target: target.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbortSignal, FetchOptions, FetchRequest};

    #[test]
    fn bare_target_defaults_to_get_with_unspecified_transport() {
        let snapshot = RequestSnapshot::capture(&CallArgs::get("https://localhost/foo")).unwrap();

        assert_eq!(snapshot.method(), "GET");
        assert_eq!(snapshot.url_str(), "https://localhost/foo");
        assert!(snapshot.body().is_none());
        assert!(snapshot.transport().mode.is_none());
        assert!(snapshot.transport().signal.is_none());
        assert!(snapshot.transport().window.is_none());
    }

    #[test]
    fn options_method_is_uppercased() {
        let args = CallArgs::with_options(
            "https://localhost/foo",
            FetchOptions {
                method: Some("post".into()),
                ..Default::default()
            },
        );
        let snapshot = RequestSnapshot::capture(&args).unwrap();
        assert_eq!(snapshot.method(), "POST");
    }

    #[test]
    fn options_transport_is_copied() {
        let signal = AbortSignal::new();
        let args = CallArgs::with_options(
            "https://localhost/foo",
            FetchOptions {
                body: Some("payload".into()),
                transport: TransportOptions {
                    mode: Some("cors".into()),
                    keepalive: Some(true),
                    signal: Some(signal.clone()),
                    window: Some("parent".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let snapshot = RequestSnapshot::capture(&args).unwrap();

        assert_eq!(snapshot.body(), Some("payload"));
        assert_eq!(snapshot.transport().mode.as_deref(), Some("cors"));
        assert_eq!(snapshot.transport().keepalive, Some(true));
        assert_eq!(snapshot.transport().window.as_deref(), Some("parent"));

        // The signal on the snapshot shares the caller's flag.
        signal.abort();
        assert!(snapshot.transport().signal.as_ref().unwrap().is_aborted());
    }

    #[test]
    fn request_like_window_is_forced_unspecified() {
        let mut request = FetchRequest::builder("https://localhost/foo")
            .method("put")
            .body("data")
            .build();
        // Even if transport carries a window value, capture drops it.
        request.transport.window = Some("parent".into());

        let snapshot = RequestSnapshot::capture(&CallArgs::Request(request)).unwrap();
        assert_eq!(snapshot.method(), "PUT");
        assert_eq!(snapshot.body(), Some("data"));
        assert!(snapshot.transport().window.is_none());
    }

    #[test]
    fn request_like_body_is_cloned_eagerly() {
        let request = FetchRequest::builder("https://localhost/foo")
            .body("original")
            .build();
        let snapshot = RequestSnapshot::capture(&CallArgs::Request(request.clone())).unwrap();

        // The original stays readable after capture.
        assert_eq!(request.body(), Some("original"));
        assert_eq!(snapshot.body(), Some("original"));
    }

    #[test]
    fn malformed_target_is_invalid_target() {
        let result = RequestSnapshot::capture(&CallArgs::get("not a url"));
        assert!(matches!(result, Err(SpyError::InvalidTarget { .. })));
    }

    #[test]
    fn relative_target_is_invalid_target() {
        let result = RequestSnapshot::capture(&CallArgs::get("/foo"));
        assert!(matches!(result, Err(SpyError::InvalidTarget { .. })));
    }
}
