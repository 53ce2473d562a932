//! fetchspy-harness: test doubles and conformance fixtures for fetchspy
//!
//! Provides a scriptable [`StubClient`] to stand in for the real transport,
//! a [`MockedFailure`] error for simulating network failures, and a YAML
//! fixture runner (the [`fixture`] module) used by the conformance suite.
//!
//! # Example
//!
//! ```
//! use fetchspy::prelude::*;
//! use fetchspy_harness::StubClient;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SpyError> {
//! let stub = StubClient::answering(FetchResponse::builder().body("real").build());
//! let client = InterceptClient::new(stub, SpyRegistry::new());
//!
//! let response = client.fetch(CallArgs::get("https://localhost/")).await?;
//! assert_eq!(response.text(), "real");
//! assert_eq!(client.inner().call_count(), 1);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use fetchspy::{CallArgs, FetchClient, FetchResponse, SpyError};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

pub mod fixture;

/// A stand-in for the real transport.
///
/// Records every call that reaches it (i.e. every call the spy layer passed
/// through) and answers from a script: either the same canned response for
/// every call, or a queue of per-call results consumed front to back.
pub struct StubClient {
    canned: Option<FetchResponse>,
    script: Mutex<VecDeque<Result<FetchResponse, SpyError>>>,
    calls: Mutex<Vec<CallArgs>>,
}

impl StubClient {
    /// A stub that answers every call with a clone of `response`.
    #[must_use]
    pub fn answering(response: FetchResponse) -> Self {
        Self {
            canned: Some(response),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A stub that answers calls from `results` in order.
    ///
    /// Once the script runs dry, further calls fail with
    /// [`SpyError::Transport`] — a call reaching the stub that the test did
    /// not script for is a test bug.
    #[must_use]
    pub fn scripted(results: impl IntoIterator<Item = Result<FetchResponse, SpyError>>) -> Self {
        Self {
            canned: None,
            script: Mutex::new(results.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A stub that fails every call, for tests where nothing may pass
    /// through.
    #[must_use]
    pub fn no_network() -> Self {
        Self {
            canned: None,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The calls that reached this stub, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CallArgs> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls that reached this stub.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl FetchClient for StubClient {
    async fn fetch(&self, args: CallArgs) -> Result<FetchResponse, SpyError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(args);

        if let Some(response) = &self.canned {
            return Ok(response.clone());
        }
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(SpyError::Transport("stub script exhausted".to_string())))
    }
}

/// An error value for simulating transport failures in spy configurations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MockedFailure(pub String);

impl MockedFailure {
    /// A failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{MockedFailure, StubClient};
    pub use fetchspy::prelude::*;
}
