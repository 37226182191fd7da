//! Static validation for contract suites.
//!
//! Validation front-loads every statically knowable authoring error before a
//! single request is sent, including state references no earlier step
//! captures.
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::store;

use super::{Assertion, ContractSuite, Method, ScenarioSpec, StepSpec, SUITE_SCHEMA_VERSION};

/// Validate a suite against schema and ordering constraints.
///
/// Returns advisory warnings for accepted-but-suspect suites.
pub fn validate_suite(suite: &ContractSuite) -> Result<Vec<String>> {
    if suite.schema_version != SUITE_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported suite schema_version {}",
            suite.schema_version
        ));
    }
    if suite.name.trim().is_empty() {
        return Err(anyhow!("suite name must not be empty"));
    }
    validate_base_url(&suite.base_url)?;
    if !suite.timeout_seconds.is_finite() || suite.timeout_seconds <= 0.0 {
        return Err(anyhow!("timeout_seconds must be > 0"));
    }
    for (name, value) in &suite.headers {
        validate_header_name(name)?;
        if !store::placeholder_keys(value).is_empty() {
            return Err(anyhow!(
                "suite-level header {name} must not reference state keys"
            ));
        }
    }
    if suite.scenarios.is_empty() {
        return Err(anyhow!("suite contains no scenarios"));
    }
    let mut warnings = Vec::new();
    let mut scenario_names = BTreeSet::new();
    for scenario in &suite.scenarios {
        validate_scenario_spec(scenario, &mut warnings)
            .with_context(|| format!("validate scenario {}", scenario.name))?;
        if !scenario_names.insert(scenario.name.clone()) {
            return Err(anyhow!("duplicate scenario name {}", scenario.name));
        }
    }
    Ok(warnings)
}

fn validate_scenario_spec(scenario: &ScenarioSpec, warnings: &mut Vec<String>) -> Result<()> {
    if scenario.name.trim().is_empty() {
        return Err(anyhow!("scenario name must not be empty"));
    }
    if scenario.steps.is_empty() {
        return Err(anyhow!("scenario contains no steps"));
    }
    let mut step_names = BTreeSet::new();
    let mut available_keys: BTreeSet<String> = BTreeSet::new();
    for step in &scenario.steps {
        validate_step_spec(step).with_context(|| format!("validate step {}", step.name))?;
        if !step_names.insert(step.name.clone()) {
            return Err(anyhow!("duplicate step name {}", step.name));
        }
        if !step.has_expectations() {
            warnings.push(format!(
                "scenario {}: step {} has no expect_status or assertions",
                scenario.name, step.name
            ));
        }
        for key in step_placeholder_keys(step) {
            if !available_keys.contains(&key) {
                return Err(anyhow!(
                    "step {} references state key {key:?} that no earlier step captures",
                    step.name
                ));
            }
        }
        for key in step.capture.keys() {
            if !available_keys.insert(key.clone()) {
                warnings.push(format!(
                    "scenario {}: state key {key:?} is captured more than once",
                    scenario.name
                ));
            }
        }
    }
    Ok(())
}

fn validate_step_spec(step: &StepSpec) -> Result<()> {
    if step.name.trim().is_empty() {
        return Err(anyhow!("step name must not be empty"));
    }
    let target = step.target.trim();
    if target.is_empty() {
        return Err(anyhow!("target must not be empty"));
    }
    if !target.starts_with('/') {
        return Err(anyhow!("target must start with '/' (got {target:?})"));
    }
    if target.chars().any(char::is_whitespace) {
        return Err(anyhow!("target must not contain whitespace"));
    }
    if step.body.is_some() && matches!(step.method, Method::Get | Method::Delete) {
        return Err(anyhow!(
            "a {} step cannot carry a body",
            step.method.as_str()
        ));
    }
    for name in step.headers.keys() {
        validate_header_name(name)?;
    }
    for (name, value) in &step.query {
        if name.trim().is_empty() {
            return Err(anyhow!("query parameter names must not be empty"));
        }
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(anyhow!("query parameter {name} must be a scalar"));
        }
    }
    if let Some(status) = step.expect_status {
        validate_status(status)?;
    }
    for assertion in &step.assertions {
        validate_assertion(assertion)?;
    }
    for (key, path) in &step.capture {
        if !is_state_key(key) {
            return Err(anyhow!(
                "capture key {key:?} must match [A-Za-z_][A-Za-z0-9_]*"
            ));
        }
        let path_ok = path.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });
        if !path_ok {
            return Err(anyhow!(
                "capture path {path:?} must be a dot path of field names or indexes"
            ));
        }
    }
    Ok(())
}

fn validate_assertion(assertion: &Assertion) -> Result<()> {
    match assertion {
        Assertion::StatusEquals { status } => validate_status(*status)?,
        Assertion::BodyIsArray {} => {}
        Assertion::BodyHasProperty { key, .. } => {
            if key.trim().is_empty() {
                return Err(anyhow!("body_has_property key must not be empty"));
            }
        }
        Assertion::BodyHasExactKeys { keys } => {
            if keys.is_empty() {
                return Err(anyhow!("body_has_exact_keys requires at least one key"));
            }
            let mut seen = BTreeSet::new();
            for key in keys {
                if key.trim().is_empty() {
                    return Err(anyhow!("body_has_exact_keys keys must not be empty"));
                }
                if !seen.insert(key.as_str()) {
                    return Err(anyhow!("body_has_exact_keys contains duplicate key {key}"));
                }
            }
        }
        Assertion::MessageContains { substring } => {
            if substring.is_empty() {
                return Err(anyhow!("message_contains substring must not be empty"));
            }
        }
    }
    Ok(())
}

fn validate_status(status: u16) -> Result<()> {
    if !(100..=599).contains(&status) {
        return Err(anyhow!("status {status} is outside 100..=599"));
    }
    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<()> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("base_url must not be empty"));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(anyhow!("base_url must start with http:// or https://"));
    }
    Ok(())
}

fn validate_header_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("header names must not be empty"));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(anyhow!("header name {name:?} contains invalid characters"));
    }
    Ok(())
}

fn is_state_key(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Every state key a step reads, across target, headers, query, body, and
/// assertion payloads.
fn step_placeholder_keys(step: &StepSpec) -> BTreeSet<String> {
    let mut keys = store::placeholder_keys(&step.target);
    for value in step.headers.values() {
        keys.extend(store::placeholder_keys(value));
    }
    for value in step.query.values() {
        store::value_placeholder_keys(value, &mut keys);
    }
    if let Some(body) = step.body.as_ref() {
        store::value_placeholder_keys(body, &mut keys);
    }
    for assertion in &step.assertions {
        assertion_placeholder_keys(assertion, &mut keys);
    }
    keys
}

fn assertion_placeholder_keys(assertion: &Assertion, keys: &mut BTreeSet<String>) {
    match assertion {
        Assertion::BodyHasProperty {
            value: Some(value), ..
        } => store::value_placeholder_keys(value, keys),
        Assertion::MessageContains { substring } => {
            keys.extend(store::placeholder_keys(substring));
        }
        Assertion::StatusEquals { .. }
        | Assertion::BodyIsArray {}
        | Assertion::BodyHasProperty { value: None, .. }
        | Assertion::BodyHasExactKeys { .. } => {}
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
