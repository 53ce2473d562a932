//! `InterceptClient` — the interception hook
//!
//! A decorator over an injected [`FetchClient`]. Every call is normalized
//! into a snapshot, tested against the full registry in registration order,
//! recorded on every active matching spy, and then either answered by the
//! first matching spy that carries a response or forwarded to the inner
//! client with the original arguments untouched.

use crate::response::synthesize;
use crate::{CallArgs, FetchResponse, RequestSnapshot, SpyError, SpyRegistry};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

/// The outgoing-request seam.
///
/// The real transport implements this; so does the interception decorator,
/// which makes decoration transparent to callers and allows stacking.
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Perform an outgoing request.
    ///
    /// # Errors
    ///
    /// Transport failures, mocked failures, and malformed targets all
    /// surface here as [`SpyError`].
    async fn fetch(&self, args: CallArgs) -> Result<FetchResponse, SpyError>;
}

/// Decorator that consults a [`SpyRegistry`] before delegating to `inner`.
///
/// Holds a registry clone, so registrations and resets performed on the
/// test's copy are visible immediately. With an empty registry every call
/// passes straight through.
#[derive(Debug)]
pub struct InterceptClient<C> {
    inner: C,
    registry: SpyRegistry,
}

impl<C> InterceptClient<C> {
    /// Wrap `inner` with the spy layer backed by `registry`.
    pub fn new(inner: C, registry: SpyRegistry) -> Self {
        Self { inner, registry }
    }

    /// The registry this client consults.
    #[must_use]
    pub fn registry(&self) -> &SpyRegistry {
        &self.registry
    }

    /// The wrapped client.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwrap, returning the inner client.
    #[must_use]
    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C: FetchClient> FetchClient for InterceptClient<C> {
    async fn fetch(&self, args: CallArgs) -> Result<FetchResponse, SpyError> {
        // List snapshot up front: registration during this call (e.g. from
        // a response factory) cannot affect this call's evaluation.
        let spies = self.registry.spies();
        if spies.is_empty() {
            trace!("no spies registered, passing through");
            return self.inner.fetch(args).await;
        }

        let snapshot = Arc::new(RequestSnapshot::capture(&args)?);
        let mut winner = None;
        let mut recorded = 0usize;

        for (position, spy) in spies.iter().enumerate() {
            if !spy.matches(&snapshot) {
                continue;
            }
            spy.record(Arc::clone(&snapshot));
            recorded += 1;
            if winner.is_none() && spy.has_response() {
                winner = Some((position, spy));
            }
        }

        match winner {
            Some((position, spy)) => {
                debug!(
                    url = %snapshot.url(),
                    method = snapshot.method(),
                    position,
                    recorded,
                    "intercepted"
                );
                synthesize(spy, &snapshot).await
            }
            None => {
                debug!(
                    url = %snapshot.url(),
                    method = snapshot.method(),
                    recorded,
                    "passing through"
                );
                // Forward the original arguments verbatim: body, headers,
                // and signal reach the transport exactly as given.
                self.inner.fetch(args).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockResponse, ResponseSpec, SpyMatch};
    use std::sync::Mutex;

    /// Inner client that records forwarded calls and always answers 599.
    #[derive(Default)]
    struct Recording {
        forwarded: Mutex<Vec<CallArgs>>,
    }

    #[async_trait]
    impl FetchClient for Recording {
        async fn fetch(&self, args: CallArgs) -> Result<FetchResponse, SpyError> {
            self.forwarded.lock().unwrap().push(args);
            Ok(FetchResponse::builder()
                .status(http::StatusCode::from_u16(599).unwrap())
                .build())
        }
    }

    fn path_spy(pathname: &str) -> SpyMatch {
        SpyMatch {
            pathname: Some(pathname.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_registry_passes_through() {
        let client = InterceptClient::new(Recording::default(), SpyRegistry::new());
        let response = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 599);
        assert_eq!(client.inner().forwarded.lock().unwrap().len(), 1);

        // Unwrapping hands back the stub with its call log intact.
        let stub = client.into_inner();
        assert_eq!(stub.forwarded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn matching_spy_short_circuits_the_network() {
        let registry = SpyRegistry::new();
        let spy = registry
            .register(path_spy("/foo"), Some(MockResponse::body("foo")))
            .unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let response = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let body: String = response.json().unwrap();
        assert_eq!(body, "foo");
        assert_eq!(spy.call_count(), 1);
        assert!(client.inner().forwarded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_responder_wins_but_everyone_records() {
        let registry = SpyRegistry::new();
        let recorder = registry.register(path_spy("/foo"), None).unwrap();
        let first = registry
            .register(path_spy("/foo"), Some(MockResponse::body("first")))
            .unwrap();
        let second = registry
            .register(path_spy("/foo"), Some(MockResponse::body("second")))
            .unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let response = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();

        let body: String = response.json().unwrap();
        assert_eq!(body, "first");
        assert_eq!(recorder.call_count(), 1);
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 1);
    }

    #[tokio::test]
    async fn record_only_spy_does_not_intercept() {
        let registry = SpyRegistry::new();
        let spy = registry.register(path_spy("/foo"), None).unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let response = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();

        // Forwarded to the inner client, but still recorded.
        assert_eq!(response.status().as_u16(), 599);
        assert_eq!(spy.call_count(), 1);
        assert_eq!(client.inner().forwarded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mocked_error_rejects_the_call() {
        let registry = SpyRegistry::new();
        registry
            .register(
                path_spy("/foo"),
                Some(MockResponse::error(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
            )
            .unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let err = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap_err();

        match err {
            SpyError::Mocked(e) => assert_eq!(e.to_string(), "connection refused"),
            other => panic!("expected Mocked, got {other}"),
        }
        assert!(client.inner().forwarded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn factory_sees_the_snapshot() {
        let registry = SpyRegistry::new();
        let spy = registry
            .register(
                path_spy("/foo"),
                Some(MockResponse::factory(|_, snapshot| async move {
                    Ok(MockResponse::Json(ResponseSpec {
                        body: Some(serde_json::json!({ "echo": snapshot.method() })),
                        ..Default::default()
                    }))
                })),
            )
            .unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let response = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body, serde_json::json!({ "echo": "GET" }));
        assert_eq!(spy.call_count(), 1);
    }

    #[tokio::test]
    async fn factory_error_surfaces_as_factory() {
        let registry = SpyRegistry::new();
        registry
            .register(
                path_spy("/foo"),
                Some(MockResponse::factory(|_, _| async {
                    Err("boom".into())
                })),
            )
            .unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let err = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpyError::Factory { .. }));
    }

    #[tokio::test]
    async fn once_spy_intercepts_exactly_once() {
        let registry = SpyRegistry::new();
        let spy = registry
            .register_once(path_spy("/foo"), Some(MockResponse::body("only")))
            .unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let first = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();
        assert_eq!(first.status().as_u16(), 200);

        let second = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();
        assert_eq!(second.status().as_u16(), 599);
        assert_eq!(spy.call_count(), 1);
        assert!(!spy.is_active());
    }

    #[tokio::test]
    async fn reset_restores_pass_through() {
        let registry = SpyRegistry::new();
        registry
            .register(path_spy("/foo"), Some(MockResponse::body("foo")))
            .unwrap();
        let client = InterceptClient::new(Recording::default(), registry.clone());

        let mocked = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();
        assert_eq!(mocked.status().as_u16(), 200);

        registry.reset();
        let real = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();
        assert_eq!(real.status().as_u16(), 599);
    }

    #[tokio::test]
    async fn registration_mid_flight_misses_the_current_call() {
        let registry = SpyRegistry::new();
        let registry_for_factory = registry.clone();
        let late = Arc::new(Mutex::new(None));
        let late_slot = Arc::clone(&late);

        registry
            .register(
                path_spy("/foo"),
                Some(MockResponse::factory(move |_, _| {
                    let registry = registry_for_factory.clone();
                    let slot = Arc::clone(&late_slot);
                    async move {
                        // Registered while /foo is in flight.
                        let handle = registry
                            .register(SpyMatch::default(), Some(MockResponse::body("late")))?;
                        *slot.lock().unwrap() = Some(handle);
                        Ok(MockResponse::body("from factory"))
                    }
                })),
            )
            .unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let response = client
            .fetch(CallArgs::get("https://localhost/foo"))
            .await
            .unwrap();

        let body: String = response.json().unwrap();
        assert_eq!(body, "from factory");
        // The spy registered mid-flight never saw the in-flight call.
        let late = late.lock().unwrap();
        assert_eq!(late.as_ref().unwrap().call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_target_rejects_before_matching() {
        let registry = SpyRegistry::new();
        let spy = registry.register(SpyMatch::default(), None).unwrap();
        let client = InterceptClient::new(Recording::default(), registry);

        let err = client.fetch(CallArgs::get("not a url")).await.unwrap_err();
        assert!(matches!(err, SpyError::InvalidTarget { .. }));
        assert_eq!(spy.call_count(), 0);
    }
}
