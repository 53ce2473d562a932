//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them through the full interception path:
//! register spies, issue calls against an `InterceptClient` over a
//! [`StubClient`], and compare outcomes.
//!
//! Each case runs against a fresh registry, so cases within a fixture are
//! independent; a case may issue the same request several times via
//! `repeat` (for single-shot spy semantics).

use crate::StubClient;
use fetchspy::{
    CallArgs, FetchClient, FetchOptions, FetchResponse, InterceptClient, MockResponse,
    ResponseSpec, SpyError, SpyHandle, SpyMatch, SpyRegistry,
};
use http::StatusCode;
use serde::Deserialize;

/// Status the pass-through stub answers with. Deliberately outside any
/// range a fixture would mock, so a pass-through is unambiguous.
const PASSTHROUGH_STATUS: u16 = 599;

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    pub description: String,
    pub spies: Vec<SpyFixture>,
    pub cases: Vec<CaseFixture>,
}

/// One spy registration from YAML
#[derive(Debug, Deserialize)]
pub struct SpyFixture {
    /// Matching dimensions; an empty map matches every request.
    #[serde(rename = "match", default)]
    pub matches: SpyMatch,
    /// Partial response description; absent means record-only.
    #[serde(default)]
    pub respond: Option<ResponseSpec>,
    /// Single-shot registration.
    #[serde(default)]
    pub once: bool,
}

/// One test case: a request (possibly repeated) and the expected outcome
/// of its final issue.
#[derive(Debug, Deserialize)]
pub struct CaseFixture {
    pub name: String,
    pub request: RequestFixture,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    pub expect: ExpectFixture,
}

fn default_repeat() -> usize {
    1
}

/// The request a case issues
#[derive(Debug, Deserialize)]
pub struct RequestFixture {
    pub target: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl RequestFixture {
    fn build(&self) -> CallArgs {
        if self.method.is_none() && self.body.is_none() {
            return CallArgs::get(&self.target);
        }
        CallArgs::with_options(
            &self.target,
            FetchOptions {
                method: self.method.clone(),
                body: self.body.clone(),
                ..Default::default()
            },
        )
    }
}

/// Expected outcome of a case's final request
#[derive(Debug, Deserialize)]
pub struct ExpectFixture {
    pub outcome: Outcome,
    /// Expected status of a mocked response.
    #[serde(default)]
    pub status: Option<u16>,
    /// Expected JSON body of a mocked response.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    /// Expected call counts, one per registered spy, after the whole case.
    #[serde(default)]
    pub calls: Option<Vec<usize>>,
}

/// How a case's final request resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Answered by a spy.
    Mocked,
    /// Forwarded to the inner client.
    Passthrough,
    /// Rejected with an error.
    Error,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub detail: String,
}

impl Fixture {
    /// Parse a fixture from YAML
    ///
    /// # Errors
    ///
    /// Returns the deserialization error for malformed YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    ///
    /// # Errors
    ///
    /// Returns the first deserialization error encountered.
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Run all test cases and return results
    pub async fn run(&self) -> Vec<CaseResult> {
        let mut results = Vec::with_capacity(self.cases.len());
        for case in &self.cases {
            results.push(self.run_case(case).await);
        }
        results
    }

    /// Run all test cases and panic on first failure
    pub async fn run_and_assert(&self) {
        for result in self.run().await {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: {}",
                self.name, result.case_name, result.detail
            );
        }
    }

    async fn run_case(&self, case: &CaseFixture) -> CaseResult {
        let registry = SpyRegistry::new();
        let mut handles: Vec<SpyHandle> = Vec::with_capacity(self.spies.len());
        for spy in &self.spies {
            let response = spy.respond.clone().map(MockResponse::Json);
            let registered = if spy.once {
                registry.register_once(spy.matches.clone(), response)
            } else {
                registry.register(spy.matches.clone(), response)
            };
            match registered {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    return CaseResult {
                        case_name: case.name.clone(),
                        passed: false,
                        detail: format!("spy registration failed: {e}"),
                    }
                }
            }
        }

        let stub = StubClient::answering(
            FetchResponse::builder()
                .status(StatusCode::from_u16(PASSTHROUGH_STATUS).unwrap())
                .build(),
        );
        let client = InterceptClient::new(stub, registry);

        let mut last = None;
        for _ in 0..case.repeat.max(1) {
            last = Some(client.fetch(case.request.build()).await);
        }
        let last = last.unwrap();

        if let Some(detail) = check_outcome(&case.expect, &last) {
            return CaseResult {
                case_name: case.name.clone(),
                passed: false,
                detail,
            };
        }

        if let Some(expected_calls) = &case.expect.calls {
            let actual: Vec<usize> = handles.iter().map(SpyHandle::call_count).collect();
            if &actual != expected_calls {
                return CaseResult {
                    case_name: case.name.clone(),
                    passed: false,
                    detail: format!("expected call counts {expected_calls:?}, got {actual:?}"),
                };
            }
        }

        CaseResult {
            case_name: case.name.clone(),
            passed: true,
            detail: String::new(),
        }
    }
}

/// Compare a case's final result to its expectation; `None` means pass.
fn check_outcome(
    expect: &ExpectFixture,
    result: &Result<FetchResponse, SpyError>,
) -> Option<String> {
    match (expect.outcome, result) {
        (Outcome::Error, Err(_)) => None,
        (Outcome::Error, Ok(r)) => Some(format!("expected error, got status {}", r.status())),
        (Outcome::Mocked | Outcome::Passthrough, Err(e)) => {
            Some(format!("expected a response, got error: {e}"))
        }
        (Outcome::Passthrough, Ok(r)) => {
            if r.status().as_u16() == PASSTHROUGH_STATUS {
                None
            } else {
                Some(format!("expected pass-through, got status {}", r.status()))
            }
        }
        (Outcome::Mocked, Ok(r)) => {
            if r.status().as_u16() == PASSTHROUGH_STATUS {
                return Some("expected mocked response, call passed through".to_string());
            }
            if let Some(status) = expect.status {
                if r.status().as_u16() != status {
                    return Some(format!("expected status {status}, got {}", r.status()));
                }
            }
            if let Some(body) = &expect.body {
                match r.json::<serde_json::Value>() {
                    Ok(actual) if &actual == body => {}
                    Ok(actual) => return Some(format!("expected body {body}, got {actual}")),
                    Err(e) => return Some(format!("body is not JSON: {e}")),
                }
            }
            None
        }
    }
}
