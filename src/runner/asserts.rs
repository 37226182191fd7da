//! Assertion evaluation over captured responses.
//!
//! Every mismatch becomes a structured record with rendered expected and
//! observed values; assertions never mutate the response or the store.
use serde_json::Value;
use std::collections::BTreeSet;

use crate::http::HttpResponse;
use crate::report::AssertionFailure;
use crate::suite::Assertion;

/// Evaluate resolved assertions against one response, in declared order.
pub(super) fn evaluate_assertions(
    step_name: &str,
    assertions: &[Assertion],
    response: &HttpResponse,
) -> Vec<AssertionFailure> {
    let mut failures = Vec::new();
    for assertion in assertions {
        if let Some((expected, actual)) = check_assertion(assertion, response) {
            failures.push(AssertionFailure {
                step: step_name.to_string(),
                kind: assertion.kind().to_string(),
                expected,
                actual,
            });
        }
    }
    failures
}

fn check_assertion(assertion: &Assertion, response: &HttpResponse) -> Option<(String, String)> {
    match assertion {
        Assertion::StatusEquals { status } => check_status(*status, response),
        Assertion::BodyIsArray {} => check_body_is_array(response),
        Assertion::BodyHasProperty { key, value } => {
            check_body_has_property(key, value.as_ref(), response)
        }
        Assertion::BodyHasExactKeys { keys } => check_body_has_exact_keys(keys, response),
        Assertion::MessageContains { substring } => check_message_contains(substring, response),
    }
}

fn check_status(expected: u16, response: &HttpResponse) -> Option<(String, String)> {
    (response.status != expected).then(|| (expected.to_string(), response.status.to_string()))
}

fn check_body_is_array(response: &HttpResponse) -> Option<(String, String)> {
    match response.json.as_ref() {
        Some(Value::Array(_)) => None,
        observed => Some(("array body".to_string(), body_kind(observed, response))),
    }
}

fn check_body_has_property(
    key: &str,
    expected: Option<&Value>,
    response: &HttpResponse,
) -> Option<(String, String)> {
    let Some(Value::Object(fields)) = response.json.as_ref() else {
        return Some((
            property_expectation(key, expected),
            body_kind(response.json.as_ref(), response),
        ));
    };
    let Some(observed) = fields.get(key) else {
        return Some((
            property_expectation(key, expected),
            format!("no {key:?} property"),
        ));
    };
    match expected {
        Some(value) if observed != value => {
            Some((property_expectation(key, expected), observed.to_string()))
        }
        _ => None,
    }
}

fn check_body_has_exact_keys(
    keys: &[String],
    response: &HttpResponse,
) -> Option<(String, String)> {
    let expected: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
    let expected_list = expected.iter().copied().collect::<Vec<_>>().join(", ");
    let Some(Value::Object(fields)) = response.json.as_ref() else {
        return Some((
            format!("object with exact keys {{{expected_list}}}"),
            body_kind(response.json.as_ref(), response),
        ));
    };
    let observed: BTreeSet<&str> = fields.keys().map(String::as_str).collect();
    if observed == expected {
        return None;
    }
    let observed_list = observed.iter().copied().collect::<Vec<_>>().join(", ");
    Some((
        format!("exact keys {{{expected_list}}}"),
        format!("keys {{{observed_list}}}"),
    ))
}

fn check_message_contains(substring: &str, response: &HttpResponse) -> Option<(String, String)> {
    let expected = format!("message containing {substring:?}");
    let Some(Value::Object(fields)) = response.json.as_ref() else {
        return Some((expected, body_kind(response.json.as_ref(), response)));
    };
    match fields.get("message") {
        Some(Value::String(message)) => {
            (!message.contains(substring)).then(|| (expected, format!("message {message:?}")))
        }
        Some(other) => Some((expected, format!("non-string message {other}"))),
        None => Some((expected, "no \"message\" property".to_string())),
    }
}

fn property_expectation(key: &str, expected: Option<&Value>) -> String {
    match expected {
        Some(value) => format!("property {key:?} == {value}"),
        None => format!("property {key:?} present"),
    }
}

fn body_kind(json: Option<&Value>, response: &HttpResponse) -> String {
    match json {
        Some(Value::Null) => "null body".to_string(),
        Some(Value::Bool(_)) => "boolean body".to_string(),
        Some(Value::Number(_)) => "numeric body".to_string(),
        Some(Value::String(_)) => "string body".to_string(),
        Some(Value::Array(_)) => "array body".to_string(),
        Some(Value::Object(_)) => "object body".to_string(),
        None if response.raw_body.trim().is_empty() => "empty body".to_string(),
        None => match response.content_type() {
            Some(kind) => format!("non-JSON body ({kind})"),
            None => "non-JSON body".to_string(),
        },
    }
}

#[cfg(test)]
#[path = "asserts_tests.rs"]
mod tests;
