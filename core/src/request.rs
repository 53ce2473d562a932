//! Call arguments — the shapes an intercepted fetch accepts
//!
//! The underlying network primitive is polymorphic: callers either hand it a
//! fully built request-like value, or a target URL plus an optional options
//! bag. Instead of sniffing shapes at runtime, the call boundary is a tagged
//! variant ([`CallArgs`]) resolved once by the normalizer via exhaustive
//! matching.

use http::HeaderMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Arguments to an intercepted fetch call.
///
/// Pass-through delegation forwards this value to the inner client
/// unchanged, so everything the caller supplied (including a cancellation
/// signal) travels verbatim.
#[derive(Debug, Clone)]
pub enum CallArgs {
    /// A fully built request-like value.
    Request(FetchRequest),

    /// A target URL plus an optional options bag.
    Target {
        /// The target URL as given by the caller. Parsed (and validated)
        /// once, during snapshot capture.
        target: String,
        /// Options for the call; `None` means every attribute is
        /// unspecified and the method defaults to GET.
        options: Option<FetchOptions>,
    },
}

impl CallArgs {
    /// A bare GET call to `target` with no options.
    pub fn get(target: impl Into<String>) -> Self {
        Self::Target {
            target: target.into(),
            options: None,
        }
    }

    /// A call to `target` with the given options.
    pub fn with_options(target: impl Into<String>, options: FetchOptions) -> Self {
        Self::Target {
            target: target.into(),
            options: Some(options),
        }
    }
}

impl From<FetchRequest> for CallArgs {
    fn from(request: FetchRequest) -> Self {
        Self::Request(request)
    }
}

/// Options bag for the target-plus-options call shape.
///
/// Every field is optional; absence means "unspecified". Designed for
/// struct-literal construction with `..Default::default()`.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// HTTP method; defaults to GET when unspecified.
    pub method: Option<String>,
    /// Request body, as text.
    pub body: Option<String>,
    /// Transport attributes (headers, mode, credentials, ...).
    pub transport: TransportOptions,
}

/// The transport attributes the platform's fetch accepts.
///
/// These are carried opaquely: the interception layer copies them onto the
/// snapshot and never interprets them. String-valued attributes are kept as
/// plain strings on purpose — matchers don't constrain them, and fidelity
/// to what the caller wrote matters more than typing here.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Request headers.
    pub headers: HeaderMap,
    /// CORS mode (`cors`, `no-cors`, `same-origin`, ...).
    pub mode: Option<String>,
    /// Cache mode.
    pub cache: Option<String>,
    /// Credentials mode.
    pub credentials: Option<String>,
    /// Redirect handling.
    pub redirect: Option<String>,
    /// Referrer.
    pub referrer: Option<String>,
    /// Referrer policy.
    pub referrer_policy: Option<String>,
    /// Subresource integrity metadata.
    pub integrity: Option<String>,
    /// Keepalive flag.
    pub keepalive: Option<bool>,
    /// Cancellation signal. Preserved on the snapshot and forwarded
    /// verbatim on pass-through; the interception layer never observes it.
    pub signal: Option<AbortSignal>,
    /// Window association. Only meaningful on the options bag — a
    /// request-like value cannot carry it (see snapshot capture).
    pub window: Option<String>,
}

/// A request-like value: the first of the two call shapes.
///
/// Built via [`FetchRequest::builder`]. The method defaults to GET; the
/// builder intentionally has no `window` setter, since window association
/// is not introspectable on a request-like value.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub(crate) url: String,
    pub(crate) method: String,
    pub(crate) body: Option<String>,
    pub(crate) transport: TransportOptions,
}

impl FetchRequest {
    /// Create a builder for a request to `url`.
    #[must_use]
    pub fn builder(url: impl Into<String>) -> FetchRequestBuilder {
        FetchRequestBuilder {
            request: FetchRequest {
                url: url.into(),
                method: "GET".to_string(),
                body: None,
                transport: TransportOptions::default(),
            },
        }
    }

    /// The target URL, as given.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The transport attributes.
    #[must_use]
    pub fn transport(&self) -> &TransportOptions {
        &self.transport
    }
}

/// Builder for [`FetchRequest`].
#[derive(Debug)]
pub struct FetchRequestBuilder {
    request: FetchRequest,
}

impl FetchRequestBuilder {
    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request.method = method.into();
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    /// Add a request header.
    ///
    /// # Panics
    ///
    /// Panics if the name or value is not a valid HTTP header. Builders are
    /// test-authoring surface; a typo here should fail the test at the line
    /// that wrote it.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name: http::HeaderName = name.parse().expect("valid header name");
        let value: http::HeaderValue = value.parse().expect("valid header value");
        self.request.transport.headers.append(name, value);
        self
    }

    /// Set the CORS mode.
    #[must_use]
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.request.transport.mode = Some(mode.into());
        self
    }

    /// Set the credentials mode.
    #[must_use]
    pub fn credentials(mut self, credentials: impl Into<String>) -> Self {
        self.request.transport.credentials = Some(credentials.into());
        self
    }

    /// Set the cancellation signal.
    #[must_use]
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.request.transport.signal = Some(signal);
        self
    }

    /// Replace the whole transport options block.
    #[must_use]
    pub fn transport(mut self, transport: TransportOptions) -> Self {
        self.request.transport = transport;
        self
    }

    /// Build the request.
    #[must_use]
    pub fn build(self) -> FetchRequest {
        self.request
    }
}

/// A caller-supplied cancellation signal.
///
/// Cloning shares the underlying flag, so a snapshot's copy observes the
/// same aborted state as the caller's original. The interception layer only
/// carries the signal; it never acts on it (no timeout logic).
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Create a signal in the not-aborted state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the signal to aborted.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Whether the signal has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}
