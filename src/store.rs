//! Per-scenario state store and `{key}` placeholder resolution.
//!
//! Captured values flow between steps only through this store. Reading a key
//! no earlier step captured is a test-authoring error and always fails; it is
//! never silently tolerated.
use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern"))
}

/// Key→value memory shared by the steps of one scenario run.
#[derive(Debug, Default)]
pub struct StateStore {
    values: BTreeMap<String, Value>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every captured value at scenario start.
    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Read a captured value; a missing key is an ordering-contract violation.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.values.get(key).ok_or_else(|| {
            if self.values.is_empty() {
                anyhow!("missing state key {key:?} (nothing captured yet)")
            } else {
                let captured = self.values.keys().cloned().collect::<Vec<_>>().join(", ");
                anyhow!("missing state key {key:?} (captured: {captured})")
            }
        })
    }
}

/// Collect `{key}` placeholder names appearing in text.
pub fn placeholder_keys(text: &str) -> BTreeSet<String> {
    placeholder_pattern()
        .captures_iter(text)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Collect placeholder names recursively from a JSON value.
pub fn value_placeholder_keys(value: &Value, keys: &mut BTreeSet<String>) {
    match value {
        Value::String(text) => keys.extend(placeholder_keys(text)),
        Value::Array(items) => {
            for item in items {
                value_placeholder_keys(item, keys);
            }
        }
        Value::Object(fields) => {
            for item in fields.values() {
                value_placeholder_keys(item, keys);
            }
        }
        _ => {}
    }
}

/// Resolve `{key}` placeholders spliced into text; scalars stringify,
/// arrays and objects fail.
pub fn resolve_text(text: &str, store: &StateStore) -> Result<String> {
    let mut resolved = String::with_capacity(text.len());
    let mut last_end = 0;
    for captures in placeholder_pattern().captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let key = &captures[1];
        let value = store.get(key)?;
        resolved.push_str(&text[last_end..whole.start()]);
        resolved.push_str(&scalar_text(key, value)?);
        last_end = whole.end();
    }
    resolved.push_str(&text[last_end..]);
    Ok(resolved)
}

/// Resolve placeholders within a JSON value. A string that is exactly one
/// placeholder takes the captured value with its type preserved, so a
/// captured numeric id stays a number.
pub fn resolve_value(value: &Value, store: &StateStore) -> Result<Value> {
    match value {
        Value::String(text) => {
            if let Some(key) = whole_placeholder(text) {
                return Ok(store.get(key)?.clone());
            }
            Ok(Value::String(resolve_text(text, store)?))
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_value(item, store)?);
            }
            Ok(Value::Array(resolved))
        }
        Value::Object(fields) => {
            let mut resolved = serde_json::Map::new();
            for (field, item) in fields {
                resolved.insert(field.clone(), resolve_value(item, store)?);
            }
            Ok(Value::Object(resolved))
        }
        _ => Ok(value.clone()),
    }
}

/// Walk a dot path (`"id"`, `"data.0.id"`) into a JSON body.
pub fn body_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(fields) => fields.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn scalar_text(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Array(_) | Value::Object(_) => Err(anyhow!(
            "state key {key:?} holds a non-scalar value and cannot be spliced into text"
        )),
    }
}

fn whole_placeholder(text: &str) -> Option<&str> {
    let captures = placeholder_pattern().captures(text)?;
    let whole = captures.get(0)?;
    if whole.start() == 0 && whole.end() == text.len() {
        return captures.get(1).map(|group| group.as_str());
    }
    None
}
