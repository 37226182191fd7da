//! JSON schema types for contract suites.
//!
//! These types keep the contract declarative while Rust stays a mechanical
//! executor: every request, assertion, and capture lives in the suite file.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

fn default_timeout_seconds() -> f64 {
    10.0
}

fn default_failure_policy() -> FailurePolicy {
    FailurePolicy::Continue
}

/// HTTP method vocabulary for contract steps.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Suite behavior after a failing step.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    AbortSuite,
    Continue,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::AbortSuite => "abort_suite",
            FailurePolicy::Continue => "continue",
        }
    }
}

/// Contract suite file (`suite.json`).
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ContractSuite {
    pub schema_version: u32,
    pub name: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_failure_policy")]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

/// Ordered group of steps sharing one state store for one run.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// Single request/assert/capture unit within a scenario.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    pub name: String,
    pub method: Method,
    pub target: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capture: BTreeMap<String, String>,
}

impl StepSpec {
    /// Effective assertion list with the `expect_status` shorthand expanded.
    pub fn effective_assertions(&self) -> Vec<Assertion> {
        let mut assertions = Vec::with_capacity(self.assertions.len() + 1);
        if let Some(status) = self.expect_status {
            assertions.push(Assertion::StatusEquals { status });
        }
        assertions.extend(self.assertions.iter().cloned());
        assertions
    }

    pub fn has_expectations(&self) -> bool {
        self.expect_status.is_some() || !self.assertions.is_empty()
    }
}

/// Assertion vocabulary for contract steps.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum Assertion {
    StatusEquals {
        status: u16,
    },
    BodyIsArray {},
    BodyHasProperty {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    BodyHasExactKeys {
        keys: Vec<String>,
    },
    MessageContains {
        substring: String,
    },
}

impl Assertion {
    pub fn kind(&self) -> &'static str {
        match self {
            Assertion::StatusEquals { .. } => "status_equals",
            Assertion::BodyIsArray {} => "body_is_array",
            Assertion::BodyHasProperty { .. } => "body_has_property",
            Assertion::BodyHasExactKeys { .. } => "body_has_exact_keys",
            Assertion::MessageContains { .. } => "message_contains",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Assertion, Method, StepSpec};

    fn step() -> StepSpec {
        StepSpec {
            name: "list".to_string(),
            method: Method::Get,
            target: "/extintor".to_string(),
            headers: Default::default(),
            query: Default::default(),
            body: None,
            expect_status: None,
            assertions: Vec::new(),
            capture: Default::default(),
        }
    }

    #[test]
    fn expect_status_expands_to_leading_status_assertion() {
        let spec = StepSpec {
            expect_status: Some(201),
            assertions: vec![Assertion::BodyIsArray {}],
            ..step()
        };
        let assertions = spec.effective_assertions();
        assert_eq!(assertions.len(), 2);
        assert_eq!(assertions[0], Assertion::StatusEquals { status: 201 });
    }

    #[test]
    fn step_without_expectations_reports_none() {
        assert!(!step().has_expectations());
        let spec = StepSpec {
            expect_status: Some(200),
            ..step()
        };
        assert!(spec.has_expectations());
    }

    #[test]
    fn assertion_tags_round_trip_as_snake_case_kinds() {
        let parsed: Assertion = serde_json::from_str(r#"{"kind":"body_is_array"}"#).unwrap();
        assert_eq!(parsed, Assertion::BodyIsArray {});
        assert_eq!(parsed.kind(), "body_is_array");
        let parsed: Assertion =
            serde_json::from_str(r#"{"kind":"message_contains","substring":"obrigatório"}"#)
                .unwrap();
        assert_eq!(parsed.kind(), "message_contains");
    }
}
