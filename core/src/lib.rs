//! fetchspy - request interception for tests
//!
//! A test-side interception layer for outgoing network requests: register
//! expectations ("spies") that match requests by method, origin, pathname,
//! or query parameters, record every matched request, and optionally
//! short-circuit the real network call with a synthesized response or a
//! simulated failure.
//!
//! # Architecture
//!
//! ```text
//! caller → InterceptClient::fetch(CallArgs)
//!              ↓ capture()
//!          RequestSnapshot (immutable, one per call)
//!              ↓ per spy, in registration order
//!          RequestMatcher (AND-composed sub-predicates)
//!              ↓ first match with a configured response
//!          synthesize() → FetchResponse | rejection
//!              ↓ otherwise
//!          inner FetchClient (pass-through, args unchanged)
//! ```
//!
//! There is no process-global hook: the interception layer is an explicit
//! decorator over an injected [`FetchClient`], and spy state lives in an
//! owned [`SpyRegistry`] handed to the decorator at construction. Parallel
//! test workers each build their own registry and never share state.
//!
//! # Key Invariants
//!
//! 1. **Registration order is evaluation order**: spies are tested strictly
//!    in the order they were registered, for every call.
//!
//! 2. **First responder wins**: the first matching spy that carries a
//!    response supplies the result. Later spies never contribute a response
//!    for that call.
//!
//! 3. **Every match records**: a matching spy appends the snapshot to its
//!    own call log whether or not it supplied the winning response. A spy
//!    with no response only records and never intercepts.
//!
//! # Example
//!
//! ```
//! use fetchspy::{CallArgs, FetchClient, InterceptClient, MockResponse, ResponseSpec,
//!                SpyMatch, SpyRegistry};
//! # use fetchspy::{FetchResponse, SpyError};
//! # struct NoNetwork;
//! # #[async_trait::async_trait]
//! # impl FetchClient for NoNetwork {
//! #     async fn fetch(&self, _args: CallArgs) -> Result<FetchResponse, SpyError> {
//! #         Err(SpyError::Transport("no network in tests".into()))
//! #     }
//! # }
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SpyError> {
//! let registry = SpyRegistry::new();
//! let spy = registry.register(
//!     SpyMatch { pathname: Some("/foo".into()), ..Default::default() },
//!     Some(MockResponse::Json(ResponseSpec {
//!         body: Some(serde_json::json!("foo")),
//!         ..Default::default()
//!     })),
//! )?;
//!
//! let client = InterceptClient::new(NoNetwork, registry.clone());
//! let response = client.fetch(CallArgs::get("https://localhost/foo")).await?;
//!
//! assert_eq!(response.status().as_u16(), 200);
//! assert_eq!(spy.calls()[0].method(), "GET");
//! # Ok(())
//! # }
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod intercept;
mod matcher;
mod registry;
mod request;
mod response;
mod snapshot;
mod spy;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

pub use intercept::{FetchClient, InterceptClient};
pub use matcher::{PathGlob, RequestMatcher, SpyMatch};
pub use registry::SpyRegistry;
pub use request::{AbortSignal, CallArgs, FetchOptions, FetchRequest, FetchRequestBuilder,
                  TransportOptions};
pub use response::{FetchResponse, FetchResponseBuilder, MockResponse, ResponseFactory,
                   ResponseSpec};
pub use snapshot::RequestSnapshot;
pub use spy::{Spy, SpyHandle};

/// Boxed error type carried by response factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use fetchspy::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AbortSignal,
        BoxError,
        CallArgs,
        FetchClient,
        FetchOptions,
        FetchRequest,
        FetchResponse,
        InterceptClient,
        MockResponse,
        RequestMatcher,
        RequestSnapshot,
        ResponseSpec,
        Spy,
        SpyError,
        SpyHandle,
        SpyMatch,
        SpyRegistry,
        TransportOptions,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

use std::sync::Arc;

/// Errors from spy registration, request capture, and response synthesis.
///
/// There are no retries anywhere in this layer: every error is surfaced
/// immediately to the caller of the intercepted fetch (or to the caller of
/// `register` for configuration errors).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpyError {
    /// The fetch target could not be parsed as an absolute URL.
    ///
    /// Surfaced from the intercepted call exactly where the real transport
    /// would have failed to construct the request.
    #[error("invalid fetch target \"{target}\": {source}")]
    InvalidTarget {
        /// The target string as given by the caller.
        target: String,
        /// The underlying URL parse error.
        #[source]
        source: url::ParseError,
    },

    /// A configured `origin` filter is not a parseable URL origin.
    ///
    /// Caught at registration time, when the matcher is compiled.
    #[error("invalid origin filter \"{origin}\": {source}")]
    InvalidOrigin {
        /// The origin string from the spy configuration.
        origin: String,
        /// The underlying URL parse error.
        #[source]
        source: url::ParseError,
    },

    /// A pathname glob failed to compile.
    ///
    /// The glob compiler escapes its input, so this indicates a pattern far
    /// beyond any reasonable configuration (e.g. exceeding regex size limits).
    #[error("invalid pathname pattern \"{pattern}\": {message}")]
    InvalidPattern {
        /// The pathname pattern from the spy configuration.
        pattern: String,
        /// The underlying regex error message.
        message: String,
    },

    /// A partial response description could not be turned into a response.
    #[error("invalid mock response: {reason}")]
    InvalidResponse {
        /// What was wrong with the description.
        reason: String,
    },

    /// A response factory failed.
    ///
    /// The caller sees this exactly like an asynchronous transport failure.
    #[error("response factory failed: {message}")]
    Factory {
        /// The factory's error, stringified.
        message: String,
    },

    /// A spy with no configured response was asked to synthesize one.
    ///
    /// The interception hook only synthesizes for spies that carry a
    /// response, so this is an internal invariant violation. It fails loudly
    /// rather than silently passing through.
    #[error("spy matched but has no response configured")]
    NoResponseConfigured,

    /// A mocked network failure, carrying the exact error the spy was
    /// configured with. This is the intentional mechanism for simulating
    /// transport failures, not an error in the interception layer itself.
    #[error("mocked network failure: {0}")]
    Mocked(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// A transport-level failure from the underlying client.
    #[error("transport error: {0}")]
    Transport(String),
}
