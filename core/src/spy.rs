//! `Spy` — a registered matcher plus its recorded calls
//!
//! A spy owns a compiled matcher, an optional mock response, and a
//! growable call log. The log grows monotonically for the spy's lifetime
//! and is handed out read-only through [`SpyHandle`] so external assertions
//! observe the live list.

use crate::{MockResponse, RequestMatcher, RequestSnapshot};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A registered spy.
///
/// Created by [`SpyRegistry::register`](crate::SpyRegistry::register) and
/// owned by the registry until a reset. Snapshots appended to `calls` are
/// shared (`Arc`) and never mutated.
pub struct Spy {
    matcher: RequestMatcher,
    response: Option<MockResponse>,
    calls: Mutex<Vec<Arc<RequestSnapshot>>>,
    once: bool,
    active: AtomicBool,
}

impl Spy {
    pub(crate) fn new(matcher: RequestMatcher, response: Option<MockResponse>, once: bool) -> Self {
        Self {
            matcher,
            response,
            calls: Mutex::new(Vec::new()),
            once,
            active: AtomicBool::new(true),
        }
    }

    /// Test this spy's predicate against a snapshot.
    ///
    /// A deactivated single-shot spy matches nothing.
    #[must_use]
    pub fn matches(&self, snapshot: &RequestSnapshot) -> bool {
        self.is_active() && self.matcher.matches(snapshot)
    }

    /// Append a matched snapshot to the call log.
    ///
    /// A single-shot spy deactivates itself after its first recorded match.
    pub(crate) fn record(&self, snapshot: Arc<RequestSnapshot>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
        if self.once {
            self.active.store(false, Ordering::SeqCst);
        }
    }

    /// Whether this spy carries a response (i.e. can intercept).
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub(crate) fn response(&self) -> Option<&MockResponse> {
        self.response.as_ref()
    }

    /// The compiled matcher.
    #[must_use]
    pub fn matcher(&self) -> &RequestMatcher {
        &self.matcher
    }

    /// The recorded calls, in interception order.
    #[must_use]
    pub fn calls(&self) -> Vec<Arc<RequestSnapshot>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether this spy still participates in matching.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether this spy deactivates after its first match.
    #[must_use]
    pub fn is_once(&self) -> bool {
        self.once
    }
}

impl fmt::Debug for Spy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spy")
            .field("matcher", &self.matcher)
            .field("has_response", &self.has_response())
            .field("call_count", &self.call_count())
            .field("once", &self.once)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Read-only handle to a registered spy.
///
/// Exposes the live call log and nothing else: no way to mutate the log,
/// no way to remove the spy from its registry (reset is wholesale). The
/// handle stays valid after a reset — the log it sees is simply frozen,
/// since the registry no longer consults the spy.
#[derive(Debug, Clone)]
pub struct SpyHandle {
    spy: Arc<Spy>,
}

impl SpyHandle {
    pub(crate) fn new(spy: Arc<Spy>) -> Self {
        Self { spy }
    }

    /// The recorded calls, in interception order.
    #[must_use]
    pub fn calls(&self) -> Vec<Arc<RequestSnapshot>> {
        self.spy.calls()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.spy.call_count()
    }

    /// The most recent recorded call, if any.
    #[must_use]
    pub fn last_call(&self) -> Option<Arc<RequestSnapshot>> {
        self.spy.calls().pop()
    }

    /// Whether the spy still participates in matching.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.spy.is_active()
    }
}
