//! Single-step execution: resolve placeholders, send, assert, capture.
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::http::{join_url, HttpClient, HttpResponse, ResolvedRequest};
use crate::report::{StepOutcome, StepStatus};
use crate::store::{self, StateStore};
use crate::suite::{Assertion, StepSpec};

use super::asserts::evaluate_assertions;
use super::BODY_SNIPPET_MAX_BYTES;

/// One executed step plus whether the scenario can still continue.
///
/// Fatal executions (unresolvable placeholders, failed captures) leave later
/// steps without the state they depend on, so the scenario aborts even under
/// the `continue` policy.
pub(super) struct StepExecution {
    pub(super) outcome: StepOutcome,
    pub(super) fatal: bool,
}

pub(super) fn execute_step(
    client: &HttpClient,
    base_url: &str,
    suite_headers: &BTreeMap<String, String>,
    step: &StepSpec,
    store: &mut StateStore,
    verbose: bool,
) -> StepExecution {
    let resolved = match resolve_step(base_url, suite_headers, step, store) {
        Ok(resolved) => resolved,
        Err(err) => {
            if verbose {
                eprintln!("step {} could not be resolved: {err:#}", step.name);
            }
            return errored_execution(step, &step.target, None, None, format!("{err:#}"), true);
        }
    };

    let started = Instant::now();
    let response = match client.send(&resolved.request) {
        Ok(response) => response,
        Err(err) => {
            if verbose {
                eprintln!("step {} transport error: {err:#}", step.name);
            }
            return errored_execution(
                step,
                &resolved.target,
                None,
                Some(started.elapsed().as_millis()),
                format!("{err:#}"),
                false,
            );
        }
    };
    let duration_ms = started.elapsed().as_millis();

    let failures = evaluate_assertions(&step.name, &resolved.assertions, &response);
    let passed = failures.is_empty();
    let mut captured = Vec::new();
    let mut capture_error = None;
    if passed {
        match capture_values(step, &response, store) {
            Ok(keys) => captured = keys,
            Err(err) => capture_error = Some(format!("{err:#}")),
        }
    }

    if verbose {
        for failure in &failures {
            eprintln!("step {} failed: {}", step.name, failure.describe());
        }
        if let Some(error) = &capture_error {
            eprintln!("step {} capture error: {error}", step.name);
        }
    }

    let fatal = capture_error.is_some();
    let status = if fatal {
        StepStatus::Errored
    } else if passed {
        StepStatus::Passed
    } else {
        StepStatus::Failed
    };
    let body_snippet = if status == StepStatus::Passed {
        String::new()
    } else {
        bounded_snippet(&response.raw_body, BODY_SNIPPET_MAX_BYTES)
    };
    StepExecution {
        outcome: StepOutcome {
            step: step.name.clone(),
            method: step.method.as_str().to_string(),
            target: resolved.target,
            status,
            observed_status: Some(response.status),
            duration_ms: Some(duration_ms),
            failures,
            error: capture_error,
            captured,
            body_snippet,
        },
        fatal,
    }
}

/// Outcome shell for a step that never ran because an earlier one stopped
/// the scenario or the suite.
pub(super) fn aborted_outcome(step: &StepSpec) -> StepOutcome {
    StepOutcome {
        step: step.name.clone(),
        method: step.method.as_str().to_string(),
        target: step.target.clone(),
        status: StepStatus::Aborted,
        observed_status: None,
        duration_ms: None,
        failures: Vec::new(),
        error: None,
        captured: Vec::new(),
        body_snippet: String::new(),
    }
}

#[derive(Debug)]
struct ResolvedStep {
    request: ResolvedRequest,
    assertions: Vec<Assertion>,
    target: String,
}

/// Substitute captured state into every placeholder-bearing field of a step.
///
/// Suite-level headers are forwarded as-is; validation rejects placeholders
/// in them because they apply before any step has captured state.
fn resolve_step(
    base_url: &str,
    suite_headers: &BTreeMap<String, String>,
    step: &StepSpec,
    store: &StateStore,
) -> Result<ResolvedStep> {
    let target = store::resolve_text(&step.target, store)
        .with_context(|| format!("resolve target {}", step.target))?;
    let mut headers = suite_headers.clone();
    for (name, value) in &step.headers {
        let resolved = store::resolve_text(value, store)
            .with_context(|| format!("resolve header {name}"))?;
        headers.insert(name.clone(), resolved);
    }
    let mut query = Vec::with_capacity(step.query.len());
    for (name, value) in &step.query {
        let resolved = store::resolve_value(value, store)
            .with_context(|| format!("resolve query parameter {name}"))?;
        query.push((name.clone(), query_text(name, &resolved)?));
    }
    let body = match step.body.as_ref() {
        Some(body) => Some(store::resolve_value(body, store).context("resolve request body")?),
        None => None,
    };
    let mut assertions = Vec::new();
    for assertion in step.effective_assertions() {
        assertions.push(resolve_assertion(assertion, store)?);
    }
    Ok(ResolvedStep {
        request: ResolvedRequest {
            method: step.method,
            url: join_url(base_url, &target),
            headers,
            query,
            body,
        },
        assertions,
        target,
    })
}

fn query_text(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(anyhow!("query parameter {name} must resolve to a scalar")),
    }
}

fn resolve_assertion(assertion: Assertion, store: &StateStore) -> Result<Assertion> {
    Ok(match assertion {
        Assertion::BodyHasProperty {
            key,
            value: Some(value),
        } => Assertion::BodyHasProperty {
            key,
            value: Some(
                store::resolve_value(&value, store).context("resolve assertion value")?,
            ),
        },
        Assertion::MessageContains { substring } => Assertion::MessageContains {
            substring: store::resolve_text(&substring, store)
                .context("resolve assertion substring")?,
        },
        other => other,
    })
}

fn capture_values(
    step: &StepSpec,
    response: &HttpResponse,
    store: &mut StateStore,
) -> Result<Vec<String>> {
    if step.capture.is_empty() {
        return Ok(Vec::new());
    }
    let body = response
        .json
        .as_ref()
        .ok_or_else(|| anyhow!("cannot capture from a non-JSON body"))?;
    let mut captured = Vec::with_capacity(step.capture.len());
    for (key, path) in &step.capture {
        let value = store::body_path(body, path)
            .ok_or_else(|| anyhow!("capture {key:?} found nothing at body path {path:?}"))?;
        store.set(key, value.clone());
        tracing::debug!(key = key.as_str(), path = path.as_str(), "captured state");
        captured.push(key.clone());
    }
    Ok(captured)
}

fn errored_execution(
    step: &StepSpec,
    target: &str,
    observed_status: Option<u16>,
    duration_ms: Option<u128>,
    error: String,
    fatal: bool,
) -> StepExecution {
    StepExecution {
        outcome: StepOutcome {
            step: step.name.clone(),
            method: step.method.as_str().to_string(),
            target: target.to_string(),
            status: StepStatus::Errored,
            observed_status,
            duration_ms,
            failures: Vec::new(),
            error: Some(error),
            captured: Vec::new(),
            body_snippet: String::new(),
        },
        fatal,
    }
}

/// Trim a response body for report output without splitting UTF-8.
fn bounded_snippet(raw: &str, max_bytes: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.len() <= max_bytes {
        return trimmed.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{} [truncated]", &trimmed[..end])
}
