//! Response synthesis — from declarative description to concrete response
//!
//! A spy's response is a four-case tagged variant ([`MockResponse`]):
//! a ready-made response, an error value (simulated transport failure), a
//! partial JSON descriptor, or an async factory. The synthesizer resolves
//! the description with a single exhaustive match and produces either a
//! [`FetchResponse`] or a rejection.

use crate::{BoxError, RequestSnapshot, Spy, SpyError};
use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// A concrete response value, as handed back from an intercepted call.
///
/// Owns its data: cloning is cheap (shared body bytes) and a spy holding a
/// `Ready` response can serve it for every matched call.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    body: Bytes,
}

impl FetchResponse {
    /// Create a builder. Defaults: 200, canonical reason, empty body.
    #[must_use]
    pub fn builder() -> FetchResponseBuilder {
        FetchResponseBuilder {
            status: StatusCode::OK,
            status_text: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status text (reason phrase).
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A single header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if the body is not valid JSON for
    /// `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Builder for [`FetchResponse`].
#[derive(Debug)]
pub struct FetchResponseBuilder {
    status: StatusCode,
    status_text: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl FetchResponseBuilder {
    /// Set the status code.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set the status text.
    #[must_use]
    pub fn status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    /// Add a header.
    ///
    /// # Panics
    ///
    /// Panics on an invalid header name or value; builders are
    /// test-authoring surface.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name: HeaderName = name.parse().expect("valid header name");
        let value: HeaderValue = value.parse().expect("valid header value");
        self.headers.append(name, value);
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the response. A missing status text falls back to the
    /// status's canonical reason (empty for unknown codes).
    #[must_use]
    pub fn build(self) -> FetchResponse {
        let status_text = self
            .status_text
            .unwrap_or_else(|| canonical_reason(self.status));
        FetchResponse {
            status: self.status,
            status_text,
            headers: self.headers,
            body: self.body,
        }
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("").to_string()
}

/// Partial response description: what the caller declares, with defaults
/// filled in at synthesis time.
///
/// The body is JSON-serialized and the content type is forced to
/// `application/json` — the forced write happens after the caller's
/// headers, so it wins even when the caller supplied a different one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponseSpec {
    /// Status code; 200 when absent.
    pub status: Option<u16>,
    /// Status text; the status's canonical reason when absent.
    pub status_text: Option<String>,
    /// Response headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Body value, JSON-serialized. Absent means an empty body.
    pub body: Option<serde_json::Value>,
}

impl ResponseSpec {
    /// Materialize this description into a concrete response.
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::InvalidResponse`] for a status code outside
    /// 100-999 or a header name/value that is not valid HTTP.
    pub fn into_response(self) -> Result<FetchResponse, SpyError> {
        let status = match self.status {
            Some(code) => StatusCode::from_u16(code).map_err(|_| SpyError::InvalidResponse {
                reason: format!("invalid status code {code}"),
            })?,
            None => StatusCode::OK,
        };
        let status_text = self
            .status_text
            .unwrap_or_else(|| canonical_reason(status));

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| SpyError::InvalidResponse {
                    reason: format!("invalid header name \"{name}\""),
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| SpyError::InvalidResponse {
                reason: format!("invalid header value for \"{name}\""),
            })?;
            headers.append(name, value);
        }
        // Forced content type, written last so it wins over caller headers.
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = match self.body {
            Some(value) => {
                Bytes::from(serde_json::to_vec(&value).map_err(|e| SpyError::InvalidResponse {
                    reason: format!("body is not JSON-serializable: {e}"),
                })?)
            }
            None => Bytes::new(),
        };

        Ok(FetchResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

/// Async factory invoked with the spy and the intercepted snapshot.
pub type ResponseFactory = Arc<
    dyn Fn(Arc<Spy>, Arc<RequestSnapshot>) -> BoxFuture<'static, Result<MockResponse, BoxError>>
        + Send
        + Sync,
>;

/// Declarative specification of what an intercepted call resolves to.
#[derive(Clone)]
pub enum MockResponse {
    /// A ready-made response, returned unchanged.
    Ready(FetchResponse),
    /// An error value: the intercepted call rejects with exactly this error.
    Error(Arc<dyn std::error::Error + Send + Sync + 'static>),
    /// A partial descriptor, materialized as a JSON response.
    Json(ResponseSpec),
    /// An async factory producing one of the other three cases.
    Factory(ResponseFactory),
}

impl MockResponse {
    /// A rejection carrying `error`.
    pub fn error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Error(Arc::new(error))
    }

    /// A JSON response whose body is `body` (status 200).
    pub fn body(body: impl Into<serde_json::Value>) -> Self {
        Self::Json(ResponseSpec {
            body: Some(body.into()),
            ..Default::default()
        })
    }

    /// Wrap an async closure as a factory.
    pub fn factory<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<Spy>, Arc<RequestSnapshot>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MockResponse, BoxError>> + Send + 'static,
    {
        Self::Factory(Arc::new(move |spy, snapshot| Box::pin(f(spy, snapshot))))
    }
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(r) => f.debug_tuple("Ready").field(&r.status()).finish(),
            Self::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            Self::Json(spec) => f.debug_tuple("Json").field(spec).finish(),
            Self::Factory(_) => f.debug_tuple("Factory").finish(),
        }
    }
}

/// Produce the result of an intercepted call from the winning spy.
///
/// Resolves a factory first (awaiting it; failure surfaces as
/// [`SpyError::Factory`], indistinguishable from an asynchronous transport
/// failure), then matches the resolved description exhaustively.
///
/// A spy with no response at all is an invariant violation
/// ([`SpyError::NoResponseConfigured`]) — the hook only synthesizes for
/// responding spies.
pub(crate) async fn synthesize(
    spy: &Arc<Spy>,
    snapshot: &Arc<RequestSnapshot>,
) -> Result<FetchResponse, SpyError> {
    let mut resolved = spy
        .response()
        .cloned()
        .ok_or(SpyError::NoResponseConfigured)?;

    if let MockResponse::Factory(factory) = resolved {
        debug!(url = %snapshot.url(), "resolving response factory");
        resolved = factory(Arc::clone(spy), Arc::clone(snapshot))
            .await
            .map_err(|e| SpyError::Factory {
                message: e.to_string(),
            })?;
    }

    match resolved {
        MockResponse::Ready(response) => Ok(response),
        MockResponse::Error(error) => Err(SpyError::Mocked(error)),
        MockResponse::Json(spec) => spec.into_response(),
        MockResponse::Factory(_) => Err(SpyError::Factory {
            message: "factory resolved to another factory".to_string(),
        }),
    }
}
