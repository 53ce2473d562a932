//! `SpyRegistry` — ordered, owned spy state
//!
//! The registry is the only mutable shared state in the layer. It is an
//! explicitly owned value, not a process global: tests construct one, hand
//! a clone to the interception client, and keep a clone for registration
//! and reset. Clones share the same underlying list.

use crate::{MockResponse, RequestMatcher, Spy, SpyError, SpyHandle, SpyMatch};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Ordered registry of spies.
///
/// Registration appends; matching walks the list in registration order;
/// [`reset`](Self::reset) clears it wholesale. There is no partial
/// eviction — per-test cleanup resets everything, which is the intended
/// lifecycle, not a cache with an eviction policy.
///
/// # Concurrency
///
/// The list lives behind a mutex with short critical sections and no
/// suspension while locked. The interception hook snapshots the list at the
/// start of each call, so a spy registered mid-flight (e.g. from a response
/// factory) is not guaranteed to see the call that was already in progress.
#[derive(Debug, Clone, Default)]
pub struct SpyRegistry {
    spies: Arc<Mutex<Vec<Arc<Spy>>>>,
}

impl SpyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spy.
    ///
    /// Compiles the matcher, appends a spy with an empty call log, and
    /// returns a read-only handle to the live log. A spy registered with
    /// `None` for the response only records matches; it never intercepts.
    ///
    /// # Errors
    ///
    /// Returns the matcher compilation error for an invalid configuration
    /// ([`SpyError::InvalidOrigin`], [`SpyError::InvalidPattern`]).
    pub fn register(
        &self,
        config: SpyMatch,
        response: Option<MockResponse>,
    ) -> Result<SpyHandle, SpyError> {
        self.register_inner(config, response, false)
    }

    /// Register a single-shot spy: it deactivates after its first match.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_once(
        &self,
        config: SpyMatch,
        response: Option<MockResponse>,
    ) -> Result<SpyHandle, SpyError> {
        self.register_inner(config, response, true)
    }

    fn register_inner(
        &self,
        config: SpyMatch,
        response: Option<MockResponse>,
        once: bool,
    ) -> Result<SpyHandle, SpyError> {
        let matcher = RequestMatcher::compile(&config)?;
        let spy = Arc::new(Spy::new(matcher, response, once));
        let mut spies = self.spies.lock().unwrap_or_else(PoisonError::into_inner);
        spies.push(Arc::clone(&spy));
        debug!(
            position = spies.len() - 1,
            filters = spy.matcher().len(),
            responds = spy.has_response(),
            once,
            "registered spy"
        );
        Ok(SpyHandle::new(spy))
    }

    /// Clear every spy.
    ///
    /// Intended between test cases. Handles returned earlier stay usable;
    /// their call logs are frozen since the spies are no longer consulted.
    pub fn reset(&self) {
        let mut spies = self.spies.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(dropped = spies.len(), "reset spy registry");
        spies.clear();
    }

    /// Number of registered spies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no spies are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the spy list, in registration order.
    ///
    /// The interception hook iterates this snapshot, so registry mutation
    /// during an in-flight call cannot perturb that call's evaluation.
    pub(crate) fn spies(&self) -> Vec<Arc<Spy>> {
        self.spies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
